use image::RgbImage;

use crate::config::StitchConfig;
use crate::error::StitchError;
use crate::matching::{best_match, match_template, to_grayscale};
use crate::motion::ScrollWindow;

/// 連続するキーフレーム間の画素オフセット
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset {
    /// 縦方向の変位。負の値はそのまま保持するが、合成時に行を追加しない
    pub vertical: i64,
    /// 横方向の変位（一致位置のX座標）
    pub horizontal: u32,
}

/// キーフレーム列を1枚のロングスクリーンショットへ合成する
pub struct Stitcher {
    config: StitchConfig,
}

impl Stitcher {
    pub fn new(config: StitchConfig) -> Self {
        Self { config }
    }

    /// 連続するキーフレームペアごとの精密なオフセットを計算する
    ///
    /// 前のキーフレームのウィンドウ下部3分の1をテンプレートとして、
    /// 次のキーフレームのウィンドウ全体から探索する。
    pub fn compute_offsets(
        &self,
        frames: &[RgbImage],
        keyframes: &[usize],
        window: &ScrollWindow,
    ) -> Vec<Offset> {
        let h = window.height;
        let template_height = ((h as f32 * self.config.stitch_template_fraction) as u32).max(1);

        let mut offsets = Vec::with_capacity(keyframes.len().saturating_sub(1));

        for pair in keyframes.windows(2) {
            let window1 = to_grayscale(&window.crop(&frames[pair[0]]));
            let window2 = to_grayscale(&window.crop(&frames[pair[1]]));

            let template = image::imageops::crop_imm(
                &window1,
                0,
                h - template_height,
                window.width,
                template_height,
            )
            .to_image();

            let result = match_template(&window2, &template);
            let peak = best_match(&result);

            let vertical = (h - template_height) as i64 - peak.y as i64;
            let horizontal = peak.x;
            log::debug!(
                "キーフレーム{}→{}: 縦={vertical}, 横={horizontal}, スコア={:.3}",
                pair[0],
                pair[1],
                peak.score
            );

            offsets.push(Offset {
                vertical,
                horizontal,
            });
        }

        offsets
    }

    /// オフセット計算と合成をまとめて行う
    pub fn stitch(
        &self,
        frames: &[RgbImage],
        keyframes: &[usize],
        window: &ScrollWindow,
    ) -> Result<RgbImage, StitchError> {
        let offsets = self.compute_offsets(frames, keyframes, window);
        self.compose(frames, keyframes, window, &offsets)
    }

    /// ヘッダ、最初のウィンドウ全体、各キーフレームの新規部分、
    /// フッタの順に上から積み上げて最終画像を作る
    pub fn compose(
        &self,
        frames: &[RgbImage],
        keyframes: &[usize],
        window: &ScrollWindow,
        offsets: &[Offset],
    ) -> Result<RgbImage, StitchError> {
        let Some(&first_idx) = keyframes.first() else {
            return Err(StitchError::EmptyKeyframes);
        };
        let last_idx = *keyframes.last().unwrap();

        let first = &frames[first_idx];
        let (frame_width, frame_height) = first.dimensions();
        let header_height = window.y;
        let footer_y = window.y + window.height;
        let footer_height = frame_height - footer_y;

        // 負のオフセットは行を追加しないため、正の分だけを合計した
        // 上限サイズで確保し、最後に実際の行数へ切り詰める
        let extra: i64 = offsets.iter().map(|o| o.vertical.max(0)).sum();
        let total_height =
            header_height as i64 + window.height as i64 + extra + footer_height as i64;

        let mut canvas = RgbImage::new(frame_width, total_height as u32);
        let mut current_y: i64 = 0;

        // ヘッダ（最初のキーフレームのウィンドウより上の領域）
        let header =
            image::imageops::crop_imm(first, 0, 0, frame_width, header_height).to_image();
        image::imageops::replace(&mut canvas, &header, 0, current_y);
        current_y += header_height as i64;

        // 最初のキーフレームのウィンドウ全体
        image::imageops::replace(&mut canvas, &window.crop(first), window.x as i64, current_y);
        current_y += window.height as i64;

        // 後続キーフレームの新規部分（ウィンドウ下端のオフセット行分）
        for (offset, &idx) in offsets.iter().zip(&keyframes[1..]) {
            if offset.vertical <= 0 {
                continue;
            }
            let sliver_height = (offset.vertical as u32).min(window.height);

            let content = window.crop(&frames[idx]);
            let new_part = image::imageops::crop_imm(
                &content,
                0,
                window.height - sliver_height,
                window.width,
                sliver_height,
            )
            .to_image();

            // 横方向オフセット分だけ右へずらした全幅の行ブロックへ貼り付ける。
            // 覆われない列は黒のまま残る
            let mut block = RgbImage::new(window.width, sliver_height);
            let available = window.width.saturating_sub(offset.horizontal);
            if available > 0 {
                let clipped =
                    image::imageops::crop_imm(&new_part, 0, 0, available, sliver_height).to_image();
                image::imageops::replace(&mut block, &clipped, offset.horizontal as i64, 0);
            }

            image::imageops::replace(&mut canvas, &block, window.x as i64, current_y);
            current_y += sliver_height as i64;
        }

        // フッタ（最後のキーフレームのウィンドウより下の領域）
        let footer = image::imageops::crop_imm(
            &frames[last_idx],
            0,
            footer_y,
            frame_width,
            footer_height,
        )
        .to_image();
        image::imageops::replace(&mut canvas, &footer, 0, current_y);
        current_y += footer_height as i64;

        // 実際に書き込んだ行数へ切り詰める
        Ok(image::imageops::crop_imm(&canvas, 0, 0, frame_width, current_y as u32).to_image())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::scroll_frame;

    const WIDTH: u32 = 48;
    const HEADER: u32 = 12;
    const WINDOW_H: u32 = 60;
    const FOOTER: u32 = 10;
    const FRAME_H: u32 = HEADER + WINDOW_H + FOOTER;

    fn window() -> ScrollWindow {
        ScrollWindow {
            x: 0,
            y: HEADER,
            width: WIDTH,
            height: WINDOW_H,
        }
    }

    #[test]
    fn test_empty_keyframes_fails() {
        let stitcher = Stitcher::new(StitchConfig::default());
        let err = stitcher.stitch(&[], &[], &window()).unwrap_err();
        assert!(matches!(err, StitchError::EmptyKeyframes));
    }

    #[test]
    fn test_single_keyframe_reconstructs_frame() {
        let frame = scroll_frame(WIDTH, HEADER, WINDOW_H, FOOTER, 0);
        let stitcher = Stitcher::new(StitchConfig::default());

        let stitched = stitcher.stitch(&[frame.clone()], &[0], &window()).unwrap();
        assert_eq!(stitched.dimensions(), (WIDTH, FRAME_H));
        assert_eq!(stitched.as_raw(), frame.as_raw());
    }

    #[test]
    fn test_identical_keyframes_add_no_rows() {
        let frame = scroll_frame(WIDTH, HEADER, WINDOW_H, FOOTER, 0);
        let frames = vec![frame.clone(), frame.clone()];
        let stitcher = Stitcher::new(StitchConfig::default());

        let offsets = stitcher.compute_offsets(&frames, &[0, 1], &window());
        assert_eq!(offsets[0].vertical, 0);

        let stitched = stitcher.stitch(&frames, &[0, 1], &window()).unwrap();
        assert_eq!(stitched.dimensions(), (WIDTH, FRAME_H));
        assert_eq!(stitched.as_raw(), frame.as_raw());
    }

    #[test]
    fn test_offset_matches_scroll_amount() {
        let frames = vec![
            scroll_frame(WIDTH, HEADER, WINDOW_H, FOOTER, 0),
            scroll_frame(WIDTH, HEADER, WINDOW_H, FOOTER, 10),
        ];
        let stitcher = Stitcher::new(StitchConfig::default());

        let offsets = stitcher.compute_offsets(&frames, &[0, 1], &window());
        assert_eq!(offsets[0].vertical, 10);
        assert_eq!(offsets[0].horizontal, 0);

        let stitched = stitcher.stitch(&frames, &[0, 1], &window()).unwrap();
        assert_eq!(stitched.height(), FRAME_H + 10);
    }

    #[test]
    fn test_negative_offset_contributes_zero_rows() {
        let frames = vec![
            scroll_frame(WIDTH, HEADER, WINDOW_H, FOOTER, 0),
            scroll_frame(WIDTH, HEADER, WINDOW_H, FOOTER, 10),
        ];
        let stitcher = Stitcher::new(StitchConfig::default());

        let offsets = [Offset {
            vertical: -5,
            horizontal: 0,
        }];
        let stitched = stitcher
            .compose(&frames, &[0, 1], &window(), &offsets)
            .unwrap();
        assert_eq!(stitched.height(), FRAME_H);
    }

    #[test]
    fn test_horizontal_offset_shifts_sliver() {
        let frames = vec![
            scroll_frame(WIDTH, HEADER, WINDOW_H, FOOTER, 0),
            scroll_frame(WIDTH, HEADER, WINDOW_H, FOOTER, 4),
        ];
        let stitcher = Stitcher::new(StitchConfig::default());

        let offsets = [Offset {
            vertical: 4,
            horizontal: 6,
        }];
        let stitched = stitcher
            .compose(&frames, &[0, 1], &window(), &offsets)
            .unwrap();
        assert_eq!(stitched.height(), FRAME_H + 4);

        let sliver_y = HEADER + WINDOW_H;
        // ずらした分の左端の列は黒のまま
        assert_eq!(stitched.get_pixel(0, sliver_y).0, [0, 0, 0]);
        // 6ピクセル右の位置に新規部分の左端が来る
        let content = window().crop(&frames[1]);
        let expected = content.get_pixel(0, WINDOW_H - 4);
        assert_eq!(stitched.get_pixel(6, sliver_y), expected);
    }

    #[test]
    fn test_stitch_is_deterministic() {
        let frames: Vec<RgbImage> = (0..3)
            .map(|i| scroll_frame(WIDTH, HEADER, WINDOW_H, FOOTER, i * 15))
            .collect();
        let stitcher = Stitcher::new(StitchConfig::default());

        let a = stitcher.stitch(&frames, &[0, 1, 2], &window()).unwrap();
        let b = stitcher.stitch(&frames, &[0, 1, 2], &window()).unwrap();
        assert_eq!(a.as_raw(), b.as_raw());
    }
}
