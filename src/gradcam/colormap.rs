/// Jet palette: dark blue → blue → cyan → yellow → red → dark red.
///
/// Piecewise linear in each channel, peaking at 1/4 (blue), 1/2 (green) and
/// 3/4 (red) of the range. Returns `[r, g, b]`.
pub fn jet(value: u8) -> [u8; 3] {
    let x = value as f64 / 255.0;
    let channel = |center: f64| -> u8 {
        let v = (1.5 - (4.0 * x - center).abs()).clamp(0.0, 1.0);
        (v * 255.0).round() as u8
    };
    [channel(3.0), channel(2.0), channel(1.0)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_values_are_blue_and_high_values_red() {
        let [r, g, b] = jet(0);
        assert_eq!((r, g), (0, 0));
        assert!(b >= 127);

        let [r, g, b] = jet(255);
        assert!(r >= 127);
        assert_eq!((g, b), (0, 0));
    }

    #[test]
    fn midpoint_is_green_dominant() {
        let [r, g, b] = jet(128);
        assert_eq!(g, 255);
        assert!(r > 100 && b > 100 && r.abs_diff(b) < 10);
    }

    #[test]
    fn blue_fades_as_red_rises() {
        let reds: Vec<u8> = (0..=255u8).map(|v| jet(v)[0]).collect();
        let blues: Vec<u8> = (0..=255u8).map(|v| jet(v)[2]).collect();
        // Red saturates at 7/8 of the range, blue at 1/8.
        assert!(reds[..224].windows(2).all(|w| w[0] <= w[1]));
        assert!(blues[32..].windows(2).all(|w| w[0] >= w[1]));
    }
}
