use image::{GrayImage, RgbImage};

use crate::config::StitchConfig;
use crate::matching::{absdiff, best_match, match_template, threshold_binary, to_grayscale};
use crate::motion::ScrollWindow;

/// 累積スクロール量に基づいてキーフレーム候補を選択する
///
/// 走査の基準となるフレーム（アンカー）は一致の良し悪しに関わらず
/// 毎ステップ進める。累積量はステップ間の差分の和であり、
/// 直前キーフレームとの一回の比較ではない点に注意。
pub struct KeyframeSelector {
    config: StitchConfig,
}

impl KeyframeSelector {
    pub fn new(config: StitchConfig) -> Self {
        Self { config }
    }

    /// フレーム列を一度だけ走査し、候補キーフレームのインデックス列を返す
    ///
    /// 返り値は必ずフレーム0から始まり、インデックスは単調増加する。
    /// 最終フレームが選択されなかった場合は末尾に強制追加する。
    pub fn select(&self, frames: &[RgbImage], window: &ScrollWindow) -> Vec<usize> {
        if frames.is_empty() {
            return Vec::new();
        }

        let grays: Vec<GrayImage> = frames
            .iter()
            .map(|f| to_grayscale(&window.crop(f)))
            .collect();

        let h = window.height;
        let template_height = ((h as f32 * self.config.selection_template_fraction) as u32).max(1);
        // ウィンドウ中央の水平バンドをテンプレートとする
        let band_start = h / 2 - template_height / 2;
        let emission_threshold = h as f32 * self.config.emission_fraction;

        let mut candidates = vec![0usize];
        let mut last_keyframe = 0usize;

        while last_keyframe < frames.len() - 1 {
            let mut accumulated: i64 = 0;
            let mut anchor = last_keyframe;
            let mut emitted = false;

            for i in (last_keyframe + 1)..frames.len() {
                let template = image::imageops::crop_imm(
                    &grays[anchor],
                    0,
                    band_start,
                    window.width,
                    template_height,
                )
                .to_image();

                let result = match_template(&grays[i], &template);
                let peak = best_match(&result);

                if peak.score > self.config.match_confidence {
                    let offset = band_start as i64 - peak.y as i64;
                    // 非正のオフセット（逆方向・静止）は累積に寄与しない
                    if offset > 0 {
                        accumulated += offset;
                    }
                }

                // 比較基準はステップごとに進める
                anchor = i;

                if accumulated as f32 > emission_threshold {
                    log::debug!("キーフレーム発行: frame={i}, 累積={accumulated}");
                    candidates.push(i);
                    last_keyframe = i;
                    emitted = true;
                    break;
                }
            }

            if !emitted {
                break;
            }
        }

        // 末尾コンテンツを取りこぼさないよう最終フレームを保証する
        if last_keyframe != frames.len() - 1 {
            candidates.push(frames.len() - 1);
        }

        candidates
    }
}

/// スクロール領域の外側で変化した候補キーフレームを除去する
///
/// ポップアップやオーバーレイなどスクロール以外のUI変化を
/// 取り込んだフレームを合成前に落とす。
pub struct KeyframeFilter {
    config: StitchConfig,
}

impl KeyframeFilter {
    pub fn new(config: StitchConfig) -> Self {
        Self { config }
    }

    /// 候補列の順序を保ったまま、安定した候補のみを残す
    ///
    /// 各候補は直前の「候補」と比較する（直前に残した候補ではない）。
    /// 先頭の候補は無条件に残す。
    pub fn filter(
        &self,
        frames: &[RgbImage],
        candidates: &[usize],
        outside_mask: &GrayImage,
    ) -> Vec<usize> {
        let Some(&first) = candidates.first() else {
            return Vec::new();
        };

        let total_outside = outside_mask.as_raw().iter().filter(|&&v| v > 0).count();
        if total_outside == 0 {
            // ウィンドウがフレーム全体を覆っている場合は判定できない
            return candidates.to_vec();
        }

        let mut clean = vec![first];

        for pair in candidates.windows(2) {
            let prev_gray = to_grayscale(&frames[pair[0]]);
            let cur_gray = to_grayscale(&frames[pair[1]]);
            let diff = absdiff(&prev_gray, &cur_gray);
            let changed = threshold_binary(&diff, self.config.diff_threshold);

            let changed_outside = changed
                .as_raw()
                .iter()
                .zip(outside_mask.as_raw().iter())
                .filter(|&(&c, &m)| c > 0 && m > 0)
                .count();

            let change_percentage = changed_outside as f32 / total_outside as f32 * 100.0;

            if change_percentage < self.config.outside_change_limit {
                clean.push(pair[1]);
            } else {
                log::debug!(
                    "候補キーフレーム{}を破棄: 領域外変化率 {:.2}%",
                    pair[1],
                    change_percentage
                );
            }
        }

        clean
    }
}
