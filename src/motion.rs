use image::{GrayImage, Luma, RgbImage};
use std::collections::VecDeque;

use crate::config::StitchConfig;
use crate::error::StitchError;
use crate::matching::{absdiff, threshold_binary, to_grayscale};

/// スクロールするウィンドウ領域（元フレーム座標系）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ScrollWindow {
    /// フレームからウィンドウ領域を切り出す
    pub fn crop(&self, frame: &RgbImage) -> RgbImage {
        image::imageops::crop_imm(frame, self.x, self.y, self.width, self.height).to_image()
    }
}

/// ウィンドウ検出の結果
///
/// `outside_mask` はインセット適用前の生の矩形から作られ、
/// キーフレームの安定性フィルタにのみ使われる。
#[derive(Debug, Clone)]
pub struct WindowDetection {
    pub window: ScrollWindow,
    pub outside_mask: GrayImage,
}

/// 全フレームペアの差分からモーション蓄積マップを計算する
pub struct MotionFieldAnalyzer {
    config: StitchConfig,
}

impl MotionFieldAnalyzer {
    pub fn new(config: StitchConfig) -> Self {
        Self { config }
    }

    /// 連続フレームの差分を蓄積し、継続的に変化した画素を示す
    /// 二値マスクを返す
    pub fn motion_mask(&self, frames: &[RgbImage]) -> Result<GrayImage, StitchError> {
        if frames.len() < 2 {
            return Err(StitchError::InsufficientFrames {
                count: frames.len(),
            });
        }

        let (width, height) = frames[0].dimensions();
        let mut accumulator = vec![0.0f32; (width * height) as usize];

        let mut prev_gray = to_grayscale(&frames[0]);
        for frame in &frames[1..] {
            let gray = to_grayscale(frame);
            let diff = absdiff(&prev_gray, &gray);
            let changed = threshold_binary(&diff, self.config.diff_threshold);

            for (acc, &v) in accumulator.iter_mut().zip(changed.as_raw().iter()) {
                if v > 0 {
                    *acc += 1.0;
                }
            }

            prev_gray = gray;
        }

        // 最小-最大正規化で0-255へスケールしてから二値化する
        let min = accumulator.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = accumulator.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        let data: Vec<u8> = if max > min {
            accumulator
                .iter()
                .map(|&v| ((v - min) * 255.0 / (max - min)) as u8)
                .collect()
        } else {
            vec![0; accumulator.len()]
        };

        let normalized = GrayImage::from_raw(width, height, data).unwrap();
        Ok(threshold_binary(&normalized, self.config.motion_threshold))
    }
}

/// 連結領域の統計
#[derive(Debug, Clone, Copy)]
struct RegionStats {
    area: u32,
    /// x, y, width, height
    bbox: (u32, u32, u32, u32),
}

/// モーションマスクからスクロール領域の矩形と領域外マスクを導出する
pub struct WindowDetector {
    config: StitchConfig,
}

impl WindowDetector {
    pub fn new(config: StitchConfig) -> Self {
        Self { config }
    }

    pub fn detect(&self, motion_mask: &GrayImage) -> Result<WindowDetection, StitchError> {
        let regions = connected_regions(motion_mask);
        let largest = regions
            .into_iter()
            .max_by_key(|r| r.area)
            .ok_or(StitchError::NoMotionDetected)?;

        let (x, y, w, h) = largest.bbox;
        let (frame_width, frame_height) = motion_mask.dimensions();
        log::debug!("検出された生の矩形: x={x}, y={y}, {w}x{h}");

        // 領域外マスクはインセット前の矩形から作る
        let mut outside_mask = GrayImage::from_pixel(frame_width, frame_height, Luma([255]));
        for yy in y..y + h {
            for xx in x..x + w {
                outside_mask.put_pixel(xx, yy, Luma([0]));
            }
        }

        // 固定ヘッダ・フッタの映り込みを避けるため上下をインセットする
        let inset = (h as f32 * self.config.window_inset_fraction) as u32;
        let (y, h) = if h > inset * 2 {
            (y + inset, h - inset * 2)
        } else {
            (y, h)
        };

        // 検出された横方向の範囲は使わず全幅とする。このキャプチャ形式では
        // コンテンツが常にフレーム全幅に及ぶという前提に基づく
        let window = ScrollWindow {
            x: 0,
            y,
            width: frame_width,
            height: h,
        };

        Ok(WindowDetection {
            window,
            outside_mask,
        })
    }
}

/// 8近傍の連結領域を走査し、面積とバウンディングボックスを集計する
fn connected_regions(binary: &GrayImage) -> Vec<RegionStats> {
    let w = binary.width() as i32;
    let h = binary.height() as i32;
    let data = binary.as_raw();
    let mut visited = vec![false; (w * h) as usize];
    let mut regions = Vec::new();

    let neighbors: &[(i32, i32)] = &[
        (1, 0),
        (-1, 0),
        (0, 1),
        (0, -1),
        (1, 1),
        (1, -1),
        (-1, 1),
        (-1, -1),
    ];

    for sy in 0..h {
        for sx in 0..w {
            let idx = (sy * w + sx) as usize;
            if data[idx] == 0 || visited[idx] {
                continue;
            }

            let mut queue = VecDeque::new();
            queue.push_back((sx, sy));
            visited[idx] = true;

            let mut area = 0u32;
            let mut min_x = sx;
            let mut min_y = sy;
            let mut max_x = sx;
            let mut max_y = sy;

            while let Some((cx, cy)) = queue.pop_front() {
                area += 1;
                min_x = min_x.min(cx);
                min_y = min_y.min(cy);
                max_x = max_x.max(cx);
                max_y = max_y.max(cy);

                for &(dx, dy) in neighbors {
                    let nx = cx + dx;
                    let ny = cy + dy;
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }
                    let nidx = (ny * w + nx) as usize;
                    if data[nidx] == 0 || visited[nidx] {
                        continue;
                    }
                    visited[nidx] = true;
                    queue.push_back((nx, ny));
                }
            }

            regions.push(RegionStats {
                area,
                bbox: (
                    min_x as u32,
                    min_y as u32,
                    (max_x - min_x + 1) as u32,
                    (max_y - min_y + 1) as u32,
                ),
            });
        }
    }

    regions
}
