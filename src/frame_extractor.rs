use anyhow::{Context, Result};
use gstreamer::prelude::*;
use gstreamer::{self as gst, ElementFactory};
use gstreamer_app::AppSink;
use image::{ImageBuffer, Rgb, RgbImage};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// 動画情報
#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub width: i32,
    pub height: i32,
    pub fps: f64,
    pub duration_sec: f64,
}

/// 動画の全フレームをメモリ上に展開するデコーダ
///
/// 解析パイプラインは完全に展開されたフレーム列を前提とするため、
/// ストリーミングはせず一括で読み込む。
pub struct FrameExtractor;

impl FrameExtractor {
    pub fn new() -> Self {
        Self
    }

    /// GStreamerを初期化
    fn init_gstreamer() -> Result<()> {
        gst::init().context("GStreamerの初期化に失敗しました")?;
        Ok(())
    }

    /// 動画ファイルの情報を取得
    pub fn get_video_info<P: AsRef<Path>>(video_path: P) -> Result<VideoInfo> {
        Self::init_gstreamer()?;

        let video_path = video_path.as_ref();
        let uri = format!(
            "file:///{}",
            video_path
                .canonicalize()
                .context("動画ファイルのパスを解決できませんでした")?
                .to_str()
                .context("動画ファイルのパスが不正です")?
                .replace("\\", "/")
                .trim_start_matches("\\\\?\\")
        );

        let discoverer = gstreamer_pbutils::Discoverer::new(gst::ClockTime::from_seconds(10))
            .context("Discovererの作成に失敗しました")?;

        let info = discoverer
            .discover_uri(&uri)
            .context("動画の解析に失敗しました")?;

        let video_streams = info.video_streams();
        if video_streams.is_empty() {
            anyhow::bail!("動画ストリームが見つかりません");
        }

        let video_stream = &video_streams[0];
        let width = video_stream.width() as i32;
        let height = video_stream.height() as i32;
        let fps_num = video_stream.framerate().numer() as f64;
        let fps_den = video_stream.framerate().denom() as f64;
        let fps = fps_num / fps_den;

        let duration_sec = info.duration().map(|d| d.seconds() as f64).unwrap_or(0.0);

        Ok(VideoInfo {
            width,
            height,
            fps,
            duration_sec,
        })
    }

    /// 動画の全フレームをRGB画像としてメモリに読み込む
    pub fn extract_frames<P: AsRef<Path>>(&self, video_path: P) -> Result<Vec<RgbImage>> {
        Self::init_gstreamer()?;

        let video_path = video_path.as_ref();
        println!("動画ファイルを開いています: {}", video_path.display());

        let info = Self::get_video_info(video_path)?;
        println!("動画情報:");
        println!("  解像度: {}x{}", info.width, info.height);
        println!("  FPS: {:.2}", info.fps);
        println!("  再生時間: {:.2}秒", info.duration_sec);

        // GStreamerパイプラインを構築
        let pipeline = gst::Pipeline::new();

        let source = ElementFactory::make("filesrc")
            .name("source")
            .build()
            .context("filesrcの作成に失敗しました")?;

        let decodebin = ElementFactory::make("decodebin")
            .name("decoder")
            .build()
            .context("decodebinの作成に失敗しました")?;

        let videoconvert = ElementFactory::make("videoconvert")
            .name("converter")
            .build()
            .context("videoconvertの作成に失敗しました")?;

        let appsink = ElementFactory::make("appsink")
            .name("sink")
            .build()
            .context("appsinkの作成に失敗しました")?;

        let appsink = appsink
            .dynamic_cast::<AppSink>()
            .map_err(|_| anyhow::anyhow!("appsinkへのキャストに失敗しました"))?;

        appsink.set_caps(Some(
            &gst::Caps::builder("video/x-raw")
                .field("format", "RGB")
                .build(),
        ));
        appsink.set_property("emit-signals", false);
        appsink.set_property("sync", false);

        source.set_property(
            "location",
            video_path
                .to_str()
                .context("動画ファイルのパスが不正です")?,
        );

        pipeline
            .add_many(&[
                &source,
                &decodebin,
                &videoconvert,
                appsink.upcast_ref::<gst::Element>(),
            ])
            .context("エレメントの追加に失敗しました")?;

        source
            .link(&decodebin)
            .context("sourceとdecoderのリンクに失敗しました")?;

        videoconvert
            .link(appsink.upcast_ref::<gst::Element>())
            .context("converterとsinkのリンクに失敗しました")?;

        // decodebinの動的パッドをリンク
        let videoconvert_clone = videoconvert.clone();
        decodebin.connect_pad_added(move |_src, src_pad| {
            let Some(sink_pad) = videoconvert_clone.static_pad("sink") else {
                log::warn!("videoconvertのsinkパッドが見つかりません");
                return;
            };

            if !sink_pad.is_linked() {
                if let Err(e) = src_pad.link(&sink_pad) {
                    log::warn!("パッドのリンクに失敗: {e:?}");
                }
            }
        });

        println!("\nフレームを読み込み中...");

        let frames = Arc::new(Mutex::new(Vec::<RgbImage>::new()));
        let frames_clone = frames.clone();

        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let sample = appsink.pull_sample().map_err(|_| gst::FlowError::Error)?;
                    let buffer = sample.buffer().ok_or(gst::FlowError::Error)?;
                    let caps = sample.caps().ok_or(gst::FlowError::Error)?;

                    let video_info = gstreamer_video::VideoInfo::from_caps(caps)
                        .map_err(|_| gst::FlowError::Error)?;

                    let map = buffer.map_readable().map_err(|_| gst::FlowError::Error)?;

                    let width = video_info.width();
                    let height = video_info.height();

                    if let Some(frame) = ImageBuffer::<Rgb<u8>, _>::from_raw(
                        width,
                        height,
                        map.as_slice().to_vec(),
                    ) {
                        let mut frames = frames_clone.lock().unwrap();
                        frames.push(frame);

                        if frames.len() % 100 == 0 {
                            println!("  {}フレーム読み込み完了", frames.len());
                        }
                    } else {
                        log::warn!("フレームバッファの変換に失敗しました（{width}x{height}）");
                    }

                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );

        pipeline
            .set_state(gst::State::Playing)
            .context("パイプラインの開始に失敗しました")?;

        let bus = pipeline
            .bus()
            .context("パイプラインにバスがありません")?;

        for msg in bus.iter_timed(gst::ClockTime::NONE) {
            use gst::MessageView;

            match msg.view() {
                MessageView::Eos(..) => break,
                MessageView::Error(err) => {
                    pipeline.set_state(gst::State::Null).ok();
                    anyhow::bail!(
                        "エラーが発生しました: {} (デバッグ情報: {:?})",
                        err.error(),
                        err.debug()
                    );
                }
                _ => (),
            }
        }

        pipeline
            .set_state(gst::State::Null)
            .context("パイプラインの停止に失敗しました")?;

        let frames = Arc::try_unwrap(frames)
            .map(|m| m.into_inner().unwrap())
            .unwrap_or_else(|arc| arc.lock().unwrap().clone());

        println!("読み込み完了: {}フレーム", frames.len());

        Ok(frames)
    }
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new()
    }
}
