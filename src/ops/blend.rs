use image::Rgba;

/// Average `colors` channel-wise and optionally darken the result.
///
/// Each channel is summed and floor-divided by the number of colors. When
/// `darken` is set, the averaged RGB goes through an HSV round trip with its
/// value divided by `darkness`; hue, saturation and the averaged alpha are
/// left alone. An empty list blends to fully transparent.
pub fn blend_colors(colors: &[Rgba<u8>], darken: bool, darkness: f64) -> Rgba<u8> {
    if colors.is_empty() {
        return Rgba([0, 0, 0, 0]);
    }

    let mut sum = [0u32; 4];
    for c in colors {
        for (acc, &ch) in sum.iter_mut().zip(c.0.iter()) {
            *acc += ch as u32;
        }
    }
    let n = colors.len() as u32;
    let avg = sum.map(|s| (s / n) as u8);

    if !darken {
        return Rgba(avg);
    }

    let (h, s, v) = rgb_to_hsv(avg[0] as f64, avg[1] as f64, avg[2] as f64);
    let (r, g, b) = hsv_to_rgb(h, s, v / darkness);
    Rgba([to_channel(r), to_channel(g), to_channel(b), avg[3]])
}

// ============================================================================
// COLOR SPACE HELPERS
// ============================================================================
//
// Channels stay on the 0..255 scale: V is max(r, g, b) in the same units,
// H is 0..1, S is 0..1.

/// RGB → HSV (H: 0..1, S: 0..1, V: same scale as the input)
pub fn rgb_to_hsv(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if max == min {
        return (0.0, 0.0, max);
    }

    let d = max - min;
    let s = d / max;
    let rc = (max - r) / d;
    let gc = (max - g) / d;
    let bc = (max - b) / d;
    let h = if r == max {
        bc - gc
    } else if g == max {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };

    ((h / 6.0).rem_euclid(1.0), s, max)
}

/// HSV (H: 0..1, S: 0..1, V: any scale) → RGB on the scale of V
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (v, v, v);
    }

    let h6 = h * 6.0;
    let sector = h6.floor();
    let f = h6 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    match (sector as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

/// Truncate toward zero into a channel. Round-trip noise within 1e-6 of a
/// whole number snaps to it first, otherwise 49.99999 would land on 49.
#[inline]
fn to_channel(x: f64) -> u8 {
    let nearest = x.round();
    let x = if (x - nearest).abs() < 1e-6 { nearest } else { x };
    x.clamp(0.0, 255.0) as u8
}
