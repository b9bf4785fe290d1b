use thiserror::Error;

/// パイプライン各段の失敗種別
///
/// 失敗の種類ごとに異なる終了コードへ対応付けるため、
/// メッセージ文字列ではなく型で区別する。
#[derive(Debug, Error)]
pub enum StitchError {
    /// 動画ファイルを開けなかった（存在しない、デコード不能など）
    #[error("動画ファイルを開けませんでした: {path}")]
    VideoOpen {
        path: String,
        #[source]
        source: anyhow::Error,
    },
    /// 解析には最低2フレーム必要
    #[error("フレーム数が不足しています（{count}フレーム、最低2フレーム必要）")]
    InsufficientFrames { count: usize },
    /// モーションマスクから連結領域が1つも得られなかった
    #[error("一貫した動きが検出されませんでした")]
    NoMotionDetected,
    /// フィルタ後のキーフレームが空でスティッチできない
    #[error("スティッチ対象のキーフレームがありません")]
    EmptyKeyframes,
}

impl StitchError {
    /// 失敗種別ごとのプロセス終了コード
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::VideoOpen { .. } => 2,
            Self::InsufficientFrames { .. } => 3,
            Self::NoMotionDetected => 4,
            Self::EmptyKeyframes => 5,
        }
    }
}
