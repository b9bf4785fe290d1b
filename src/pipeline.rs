use image::RgbImage;

use crate::config::StitchConfig;
use crate::error::StitchError;
use crate::keyframes::{KeyframeFilter, KeyframeSelector};
use crate::motion::{MotionFieldAnalyzer, WindowDetector};
use crate::stitcher::Stitcher;

/// フレーム列からロングスクリーンショットを合成する
///
/// モーション解析 → ウィンドウ検出 → キーフレーム選択 →
/// 安定性フィルタ → スティッチの順で逐次実行する。
pub fn stitch_frames(
    frames: &[RgbImage],
    config: &StitchConfig,
) -> Result<RgbImage, StitchError> {
    let analyzer = MotionFieldAnalyzer::new(config.clone());
    let motion_mask = analyzer.motion_mask(frames)?;

    let detector = WindowDetector::new(config.clone());
    let detection = detector.detect(&motion_mask)?;
    let window = detection.window;
    println!(
        "検出されたスクロール領域: ({}, {}) {}x{}",
        window.x, window.y, window.width, window.height
    );

    let selector = KeyframeSelector::new(config.clone());
    let candidates = selector.select(frames, &window);
    println!("候補キーフレーム: {}個", candidates.len());

    let filter = KeyframeFilter::new(config.clone());
    let clean = filter.filter(frames, &candidates, &detection.outside_mask);
    println!("フィルタ後のキーフレーム: {}個", clean.len());

    let stitcher = Stitcher::new(config.clone());
    stitcher.stitch(frames, &clean, &window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::scroll_frame;

    #[test]
    fn test_end_to_end_synthetic_scroll() {
        // 1フレームあたり6ピクセルずつスクロールする13フレームの合成列。
        // ヘッダとフッタは静的なまま、高さ60のウィンドウ内を流れる
        const WIDTH: u32 = 64;
        const HEADER: u32 = 12;
        const WINDOW_H: u32 = 60;
        const FOOTER: u32 = 10;
        const STEP: u32 = 6;
        const COUNT: u32 = 13;

        let frames: Vec<RgbImage> = (0..COUNT)
            .map(|i| scroll_frame(WIDTH, HEADER, WINDOW_H, FOOTER, i * STEP))
            .collect();

        let stitched = stitch_frames(&frames, &StitchConfig::default()).unwrap();

        // ペアごとの縦オフセットは先頭から末尾までの総変位に畳み込まれるため、
        // 最終画像の高さはフレーム高 + (N-1)×S になる
        let frame_height = (HEADER + WINDOW_H + FOOTER) as i64;
        let expected = frame_height + ((COUNT - 1) * STEP) as i64;
        let actual = stitched.height() as i64;
        assert_eq!(stitched.width(), WIDTH);
        assert!(
            (actual - expected).abs() <= 2,
            "高さ {actual} が期待値 {expected} から外れている"
        );
    }

    #[test]
    fn test_end_to_end_is_deterministic() {
        let frames: Vec<RgbImage> = (0..8)
            .map(|i| scroll_frame(48, 10, 50, 8, i * 8))
            .collect();

        let a = stitch_frames(&frames, &StitchConfig::default()).unwrap();
        let b = stitch_frames(&frames, &StitchConfig::default()).unwrap();
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_insufficient_frames_propagates() {
        let frames = vec![scroll_frame(48, 10, 50, 8, 0)];
        let err = stitch_frames(&frames, &StitchConfig::default()).unwrap_err();
        assert!(matches!(err, StitchError::InsufficientFrames { count: 1 }));
    }

    #[test]
    fn test_static_video_reports_no_motion() {
        let frames: Vec<RgbImage> = (0..4).map(|_| scroll_frame(48, 10, 50, 8, 0)).collect();
        let err = stitch_frames(&frames, &StitchConfig::default()).unwrap_err();
        assert!(matches!(err, StitchError::NoMotionDetected));
    }
}
