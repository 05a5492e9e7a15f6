#![no_main]

use libfuzzer_sys::fuzz_target;
use unseen_formats::{FitDomain, LogFit};

fuzz_target!(|data: &[u8]| {
    let (x, y): (Vec<f64>, Vec<f64>) = data
        .chunks_exact(4)
        .map(|chunk| {
            let x = u16::from_le_bytes([chunk[0], chunk[1]]);
            let y = u16::from_le_bytes([chunk[2], chunk[3]]);
            (f64::from(x), f64::from(y))
        })
        .unzip();

    if let Ok(fit) = LogFit::fit(&x, &y) {
        let model = fit.model();
        assert!(model.a.is_finite() && model.b.is_finite());
        let domain = FitDomain::new(1, 100_000).unwrap();
        let result = fit.curve(domain, 16, 1.96).unwrap();
        for point in &result.points {
            assert!(point.y_lower <= point.y_fit && point.y_fit <= point.y_upper);
        }
    }
});
