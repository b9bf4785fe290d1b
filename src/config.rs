/// スティッチ処理のチューニング設定
///
/// 各しきい値はスクロール録画のロングスクリーンショット合成で
/// 実用上うまく動作するデフォルト値を持つ。
#[derive(Debug, Clone)]
pub struct StitchConfig {
    /// フレーム間差分の二値化しきい値（0-255）。この値を超えた画素を「変化あり」とみなす
    pub diff_threshold: u8,
    /// 正規化後のモーション蓄積マップの二値化しきい値（0-255）
    pub motion_threshold: u8,
    /// テンプレートマッチングの採用信頼度（正規化相互相関スコア）
    pub match_confidence: f32,
    /// スクロール領域外の変化率の上限（%）。これ以上変化した候補キーフレームは破棄する
    pub outside_change_limit: f32,
    /// 固定ヘッダ・フッタを避けるための上下インセット比率（ウィンドウ高さに対する割合）
    pub window_inset_fraction: f32,
    /// キーフレーム発行しきい値（ウィンドウ高さに対する累積スクロール量の割合）
    pub emission_fraction: f32,
    /// キーフレーム選択時のテンプレート高さ（ウィンドウ高さに対する割合）
    pub selection_template_fraction: f32,
    /// スティッチ時のテンプレート高さ（ウィンドウ高さに対する割合）
    pub stitch_template_fraction: f32,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            diff_threshold: 30,
            motion_threshold: 50,
            match_confidence: 0.7,
            outside_change_limit: 1.0,
            window_inset_fraction: 0.1,
            emission_fraction: 0.5,
            selection_template_fraction: 0.25,
            stitch_template_fraction: 1.0 / 3.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stitch_config_default() {
        let config = StitchConfig::default();
        assert_eq!(config.diff_threshold, 30);
        assert_eq!(config.motion_threshold, 50);
        assert!((config.match_confidence - 0.7).abs() < f32::EPSILON);
        assert!((config.outside_change_limit - 1.0).abs() < f32::EPSILON);
        assert!((config.window_inset_fraction - 0.1).abs() < f32::EPSILON);
        assert!((config.emission_fraction - 0.5).abs() < f32::EPSILON);
    }
}
