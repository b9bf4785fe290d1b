use scroll_stitcher::config::StitchConfig;
use scroll_stitcher::error::StitchError;
use scroll_stitcher::frame_extractor::FrameExtractor;
use scroll_stitcher::pipeline;

use anyhow::{Context, Result};
use std::env;
use std::path::Path;

const DEFAULT_VIDEO_PATH: &str = "demo.MP4";
const OUTPUT_PATH: &str = "dist/stitched_screenshot.jpg";

fn print_usage() {
    println!("使用方法:");
    println!("  scroll_stitcher [動画パス]");
    println!();
    println!("引数:");
    println!(
        "  [動画パス]  : スクロール録画の動画ファイル（デフォルト: {}）",
        DEFAULT_VIDEO_PATH
    );
    println!();
    println!("出力:");
    println!("  {}", OUTPUT_PATH);
}

fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_usage();
        return;
    }

    let video_path = args.get(1).map(String::as_str).unwrap_or(DEFAULT_VIDEO_PATH);

    if let Err(e) = run(video_path) {
        eprintln!("エラー: {:#}", e);
        let code = e
            .downcast_ref::<StitchError>()
            .map(StitchError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn run(video_path: &str) -> Result<()> {
    println!("=== ロングスクリーンショット合成 ===\n");

    let extractor = FrameExtractor::new();
    let frames = extractor
        .extract_frames(video_path)
        .map_err(|e| StitchError::VideoOpen {
            path: video_path.to_string(),
            source: e,
        })?;

    let config = StitchConfig::default();
    let stitched = pipeline::stitch_frames(&frames, &config)?;

    let output_path = Path::new(OUTPUT_PATH);
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).context("出力ディレクトリの作成に失敗しました")?;
    }
    stitched
        .save(output_path)
        .context("合成画像の保存に失敗しました")?;

    println!("\n✓ 合成が完了しました");
    println!("  サイズ: {}x{}", stitched.width(), stitched.height());
    println!("  出力先: {}", output_path.display());

    Ok(())
}
