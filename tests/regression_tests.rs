//! Regression Tests
//!
//! Curve fitting through the public API: exact linear fits, sampled curves,
//! fallback behavior and configured sample counts.

use rowql::regression::solve_linear_system;
use rowql::{fit, fit_model, Engine, EngineConfig, RegressionKind};

#[test]
fn test_linear_fit_is_exact() {
    let points = [(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)];
    let model = fit_model(&points, RegressionKind::Linear).unwrap();

    let intercept = model.coefficients[0];
    let slope = model.coefficients[1];
    assert!((slope - 2.0).abs() < 1e-9);
    assert!((intercept - 1.0).abs() < 1e-9);

    let curve = fit(&points, RegressionKind::Linear);
    assert_eq!(curve.len(), 100);
    for (x, y) in &curve {
        assert!((y - (2.0 * x + 1.0)).abs() < 1e-9, "residual at x={}", x);
    }
    // Samples start at the smallest x and advance by (max - min) / 100.
    assert_eq!(curve[0].0, 0.0);
    assert!((curve[1].0 - 0.02).abs() < 1e-12);
}

#[test]
fn test_too_few_points() {
    assert!(fit(&[(3.0, 4.0)], RegressionKind::Polynomial(2)).is_empty());
}

#[test]
fn test_polynomial_fallback_reports_linear() {
    let points = [(1.0, 2.0), (2.0, 4.0)];
    let model = fit_model(&points, RegressionKind::Polynomial(4)).unwrap();
    assert_eq!(model.kind, RegressionKind::Linear);
    assert_eq!(fit(&points, RegressionKind::Polynomial(4)).len(), 100);
}

#[test]
fn test_cubic_fit() {
    let points: Vec<(f64, f64)> = (-3..=3)
        .map(|i| {
            let x = i as f64;
            (x, x * x * x - 2.0 * x + 0.5)
        })
        .collect();
    let model = fit_model(&points, RegressionKind::Polynomial(3)).unwrap();
    let expected = [0.5, -2.0, 0.0, 1.0];
    for (got, want) in model.coefficients.iter().zip(expected) {
        assert!((got - want).abs() < 1e-6, "got {} want {}", got, want);
    }
    assert!(model.r_squared > 0.999999);
}

#[test]
fn test_engine_uses_configured_samples() {
    let engine = Engine::with_config(EngineConfig {
        curve_samples: 25,
        ..EngineConfig::default()
    });
    let curve = engine.fit(&[(1.0, 1.0), (2.0, 4.0), (3.0, 9.0)], RegressionKind::Power);
    assert_eq!(curve.len(), 25);
    assert!((curve[0].1 - 1.0).abs() < 1e-6);
}

#[test]
fn test_singular_system() {
    let matrix = vec![vec![1e-12, 0.0], vec![0.0, 1e-12]];
    assert!(solve_linear_system(&matrix, &[1.0, 1.0]).is_none());
}

#[test]
fn test_small_scale_x_still_fits() {
    let points = [(0.0, 0.0), (1e-6, 1.0), (2e-6, 2.0)];
    let curve = fit(&points, RegressionKind::Linear);
    assert_eq!(curve.len(), 100);
    assert!((curve[50].1 - 1.0).abs() < 1e-6);

    // Linearized kinds share the same line fit.
    let points = [(1e-6, 1e-6), (2e-6, 2e-6), (3e-6, 3e-6)];
    let model = fit_model(&points, RegressionKind::Power).unwrap();
    assert_eq!(model.kind, RegressionKind::Power);
    assert!((model.coefficients[1] - 1.0).abs() < 1e-6);
}
