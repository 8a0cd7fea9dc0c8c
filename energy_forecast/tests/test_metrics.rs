use approx::assert_abs_diff_eq;
use energy_forecast::metrics::{evaluate, rank_importances};
use rstest::rstest;

#[test]
fn test_mape_ignores_zero_truth() {
    let metrics = evaluate(&[0.0, 100.0, 200.0], &[10.0, 110.0, 180.0]).unwrap();

    assert!(metrics.mae.is_finite());
    assert!(metrics.rmse.is_finite());
    assert!(metrics.r2.is_finite());
    assert_abs_diff_eq!(metrics.mape.unwrap(), 10.0, epsilon = 1e-9);
}

#[test]
fn test_all_zero_truth_leaves_mape_undefined() {
    let metrics = evaluate(&[0.0, 0.0, 0.0], &[1.0, 2.0, 0.0]).unwrap();

    assert_eq!(metrics.mape, None);
    assert_abs_diff_eq!(metrics.mae, 1.0);
    assert!(metrics.r2.is_finite());
}

#[rstest]
#[case(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], 1.0)]
#[case(&[1.0, 2.0, 3.0], &[2.0, 2.0, 2.0], 0.0)]
#[case(&[5.0, 5.0], &[5.0, 5.0], 1.0)]
fn test_r2_reference_points(#[case] actual: &[f64], #[case] predicted: &[f64], #[case] r2: f64) {
    let metrics = evaluate(actual, predicted).unwrap();
    assert_abs_diff_eq!(metrics.r2, r2, epsilon = 1e-12);
}

#[test]
fn test_ranked_importances_keep_every_feature() {
    let names: Vec<String> = ["month", "lag_1", "ma_4", "region_code"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let ranked = rank_importances(&names, &[0.1, 0.5, 0.3, 0.1]).unwrap();

    assert_eq!(ranked.len(), 4);
    assert_eq!(ranked[0].feature, "lag_1");
    assert_eq!(ranked[1].feature, "ma_4");
    // Stable for ties
    assert_eq!(ranked[2].feature, "month");
    assert_eq!(ranked[3].feature, "region_code");
}
