use image::{GrayImage, RgbImage};
use rayon::prelude::*;

/// カラー画像をグレースケールへ変換
pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    image::imageops::grayscale(image)
}

/// 画素ごとの絶対差分
///
/// 両画像は同じサイズであること。
pub fn absdiff(a: &GrayImage, b: &GrayImage) -> GrayImage {
    debug_assert_eq!(a.dimensions(), b.dimensions());

    let (width, height) = a.dimensions();
    let data: Vec<u8> = a
        .as_raw()
        .iter()
        .zip(b.as_raw().iter())
        .map(|(&pa, &pb)| pa.abs_diff(pb))
        .collect();

    GrayImage::from_raw(width, height, data).unwrap()
}

/// 二値化（しきい値を超えた画素を255、それ以外を0にする）
pub fn threshold_binary(image: &GrayImage, thresh: u8) -> GrayImage {
    let (width, height) = image.dimensions();
    let data: Vec<u8> = image
        .as_raw()
        .iter()
        .map(|&v| if v > thresh { 255 } else { 0 })
        .collect();

    GrayImage::from_raw(width, height, data).unwrap()
}

/// テンプレートマッチングのスコアマップ
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub data: Vec<f32>,
    pub width: u32,
    pub height: u32,
}

impl MatchResult {
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[(y * self.width + x) as usize]
    }
}

/// スコアマップのピーク（最良一致位置）
#[derive(Debug, Clone, Copy)]
pub struct MatchPeak {
    pub x: u32,
    pub y: u32,
    pub score: f32,
}

/// 正規化相互相関（TM_CCOEFF_NORMED相当）によるテンプレートマッチング
///
/// 探索画像の各位置でテンプレートとの相関係数を計算し、
/// スコアマップを返す。スコアは[-1, 1]の範囲。
pub fn match_template(image: &GrayImage, templ: &GrayImage) -> MatchResult {
    assert!(
        image.width() >= templ.width() && image.height() >= templ.height(),
        "テンプレートは探索画像に収まるサイズであること"
    );
    assert!(
        templ.width() > 0 && templ.height() > 0,
        "テンプレートが空です"
    );

    let out_w = image.width() - templ.width() + 1;
    let out_h = image.height() - templ.height() + 1;

    let tw = templ.width() as usize;
    let th = templ.height() as usize;
    let t_raw = templ.as_raw();

    let n = (tw * th) as f32;
    let t_mean = t_raw.iter().map(|&v| v as f32).sum::<f32>() / n;
    let t_var_sum = t_raw
        .iter()
        .map(|&v| {
            let d = v as f32 - t_mean;
            d * d
        })
        .sum::<f32>();

    let mut out = vec![0.0f32; (out_w * out_h) as usize];

    out.par_chunks_mut(out_w as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..out_w as usize {
                let mut sum_i = 0.0f32;
                let mut sum_i_sq = 0.0f32;
                let mut cross = 0.0f32;

                for j in 0..th {
                    let src_row = (y + j) as u32;
                    for i in 0..tw {
                        let src_col = (x + i) as u32;
                        let iv = image.get_pixel(src_col, src_row)[0] as f32;
                        let tv = t_raw[j * tw + i] as f32;
                        sum_i += iv;
                        sum_i_sq += iv * iv;
                        cross += iv * tv;
                    }
                }

                let i_mean = sum_i / n;
                let coeff = cross - n * i_mean * t_mean;
                let i_var = sum_i_sq - n * i_mean * i_mean;
                let denom = (i_var * t_var_sum).sqrt();

                row[x] = if denom > 1e-12 { coeff / denom } else { 0.0 };
            }
        });

    MatchResult {
        data: out,
        width: out_w,
        height: out_h,
    }
}

/// スコアマップから最大スコアの位置を取得
pub fn best_match(result: &MatchResult) -> MatchPeak {
    let mut peak = MatchPeak {
        x: 0,
        y: 0,
        score: f32::NEG_INFINITY,
    };

    for y in 0..result.height {
        for x in 0..result.width {
            let v = result.get(x, y);
            if v > peak.score {
                peak = MatchPeak { x, y, score: v };
            }
        }
    }

    peak
}
