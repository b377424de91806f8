use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::{array, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::errors::FactorError;
use crate::svd::SvdEngine;
use crate::table::Table;
use crate::Pca;

fn table_4x3() -> Table {
    Table::new(
        vec!["a".into(), "b".into(), "c".into()],
        array![
            [1.0, 2.0, 3.0],
            [2.0, 1.0, 0.5],
            [4.0, 3.0, 1.0],
            [1.5, 2.5, 3.5],
        ],
    )
    .unwrap()
}

fn random_table(n_rows: usize, n_cols: usize, seed: u64) -> Table {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let values = Array2::from_shape_fn((n_rows, n_cols), |_| rng.gen_range(-3.0..3.0));
    Table::from_array(values)
}

#[test]
fn four_by_three_scenario() {
    let table = table_4x3();
    let mut pca = Pca::new().with_n_components(2);
    pca.fit(&table).unwrap();

    let eigenvalues = pca.eigenvalues().unwrap();
    assert_eq!(eigenvalues.len(), 2);
    assert!(eigenvalues.iter().all(|&v| v >= 0.0));
    assert!(eigenvalues[0] >= eigenvalues[1]);

    let percentages = pca.percentage_of_variance().unwrap();
    assert!(percentages.sum() <= 1.0 + 1e-12);
}

#[test]
fn eigenvalues_sum_to_total_inertia_at_full_rank() {
    let table = random_table(10, 4, 1);
    let mut pca = Pca::new().with_n_components(4);
    pca.fit(&table).unwrap();

    let eigenvalue_sum = pca.eigenvalues().unwrap().sum();
    assert_relative_eq!(eigenvalue_sum, pca.total_inertia().unwrap(), max_relative = 1e-10);
}

#[test]
fn truncated_eigenvalues_are_bounded_by_total_inertia() {
    let table = random_table(12, 6, 2);
    let mut pca = Pca::new().with_n_components(3);
    pca.fit(&table).unwrap();

    assert!(pca.eigenvalues().unwrap().sum() <= pca.total_inertia().unwrap() + 1e-12);
}

#[test]
fn cumulative_percentages_are_monotone_and_bounded() {
    let table = random_table(9, 5, 3);
    let mut pca = Pca::new().with_n_components(5);
    pca.fit(&table).unwrap();

    let cumulative = pca.cumulative_percentage_of_variance().unwrap();
    for pair in cumulative.windows(2) {
        assert!(pair[1] >= pair[0] - 1e-15);
    }
    assert_relative_eq!(cumulative[cumulative.len() - 1], 1.0, max_relative = 1e-10);
}

#[test]
fn fit_transform_matches_the_generic_projection_path() {
    let table = random_table(15, 4, 4);
    let mut pca = Pca::new().with_n_components(3);

    let fast = pca.fit_transform(&table).unwrap();
    let generic = pca.row_coordinates(&table).unwrap();

    assert_eq!(fast.dim(), generic.dim());
    for (a, b) in fast.iter().zip(generic.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-8);
    }
}

#[test]
fn inverse_transform_reconstructs_at_full_rank() {
    let table = random_table(8, 3, 5);
    let mut pca = Pca::new().with_n_components(3);
    pca.fit(&table).unwrap();

    let coordinates = pca.row_coordinates(&table).unwrap();
    let reconstructed = pca.inverse_transform(coordinates.view()).unwrap();
    assert_abs_diff_eq!(reconstructed, table.values().to_owned(), epsilon = 1e-8);
}

#[test]
fn row_cosine_similarities_decompose_each_row() {
    let table = random_table(10, 3, 6);
    let mut pca = Pca::new().with_n_components(3);
    pca.fit(&table).unwrap();

    let similarities = pca.row_cosine_similarities(&table).unwrap();
    for value in similarities.iter() {
        assert!((0.0..=1.0 + 1e-12).contains(value));
    }
    // At full rank every row is fully represented.
    for row in similarities.axis_iter(Axis(0)) {
        assert_relative_eq!(row.sum(), 1.0, max_relative = 1e-8);
    }
}

#[test]
fn centroid_row_has_undefined_cosine_similarities() {
    let table = table_4x3();
    let mut pca = Pca::new().with_n_components(2);
    pca.fit(&table).unwrap();

    // Column means of table_4x3: a = 2.125, b = 2.125, c = 2.0. A row at
    // the means scales to the origin, so its quality of representation is
    // the indeterminate 0/0.
    let centroid = Table::new(
        vec!["a".into(), "b".into(), "c".into()],
        array![[2.125, 2.125, 2.0]],
    )
    .unwrap();
    let similarities = pca.row_cosine_similarities(&centroid).unwrap();
    assert!(similarities.iter().all(|v| v.is_nan()));
}

#[test]
fn truncated_row_cosine_similarities_sum_below_one() {
    let table = random_table(10, 5, 7);
    let mut pca = Pca::new().with_n_components(2);
    pca.fit(&table).unwrap();

    let similarities = pca.row_cosine_similarities(&table).unwrap();
    for row in similarities.axis_iter(Axis(0)) {
        assert!(row.sum() <= 1.0 + 1e-10);
    }
}

#[test]
fn row_contributions_sum_to_one_per_component() {
    let table = random_table(11, 4, 8);
    let mut pca = Pca::new().with_n_components(3);
    pca.fit(&table).unwrap();

    let contributions = pca.row_contributions(&table).unwrap();
    for column in contributions.axis_iter(Axis(1)) {
        assert_relative_eq!(column.sum(), 1.0, max_relative = 1e-8);
    }
    assert!(contributions.iter().all(|&v| v >= 0.0));
}

#[test]
fn column_contributions_divide_by_the_eigenvalue_only() {
    let table = random_table(9, 4, 9);
    let mut pca = Pca::new().with_n_components(2);
    pca.fit(&table).unwrap();

    let coordinates = pca.column_coordinates(&table).unwrap();
    let contributions = pca.column_contributions(&table).unwrap();
    let eigenvalues = pca.eigenvalues().unwrap();
    for ((i, j), &value) in contributions.indexed_iter() {
        let expected = coordinates[[i, j]].powi(2) / eigenvalues[j];
        assert_abs_diff_eq!(value, expected, epsilon = 1e-12);
    }
}

#[test]
fn column_correlations_are_bounded() {
    let table = random_table(20, 5, 10);
    let mut pca = Pca::new().with_n_components(3);
    pca.fit(&table).unwrap();

    let correlations = pca.column_correlations(&table).unwrap();
    assert!(correlations.iter().all(|&v| v.abs() <= 1.0 + 1e-9));

    let cosines = pca.column_cosine_similarities(&table).unwrap();
    for (corr, cos) in correlations.iter().zip(cosines.iter()) {
        assert_abs_diff_eq!(corr * corr, *cos, epsilon = 1e-12);
    }
}

#[test]
fn accessors_before_fit_are_not_fitted_errors() {
    let pca = Pca::new();
    let table = table_4x3();

    assert!(matches!(pca.eigenvalues(), Err(FactorError::NotFitted)));
    assert!(matches!(pca.total_inertia(), Err(FactorError::NotFitted)));
    assert!(matches!(
        pca.percentage_of_variance(),
        Err(FactorError::NotFitted)
    ));
    assert!(matches!(
        pca.row_coordinates(&table),
        Err(FactorError::NotFitted)
    ));
    assert!(matches!(
        pca.column_coordinates(&table),
        Err(FactorError::NotFitted)
    ));
    assert!(matches!(pca.transform(&table), Err(FactorError::NotFitted)));
    assert!(matches!(
        pca.inverse_transform(array![[0.0, 0.0]].view()),
        Err(FactorError::NotFitted)
    ));
}

#[test]
fn refitting_replaces_all_derived_state() {
    let mut pca = Pca::new().with_n_components(2);

    pca.fit(&random_table(10, 3, 11)).unwrap();
    let first_inertia = pca.total_inertia().unwrap();
    assert_eq!(pca.n_features_in().unwrap(), 3);

    pca.fit(&random_table(8, 5, 12)).unwrap();
    assert_eq!(pca.n_features_in().unwrap(), 5);
    assert_ne!(pca.total_inertia().unwrap(), first_inertia);
    assert_eq!(pca.feature_names_in().unwrap().len(), 5);
}

#[test]
fn failed_fit_keeps_the_previous_state() {
    let table = table_4x3();
    let mut pca = Pca::new().with_n_components(2);
    pca.fit(&table).unwrap();
    let eigenvalues_before = pca.eigenvalues().unwrap();

    // A constant column cannot be scaled to unit variance.
    let degenerate = Table::new(
        vec!["a".into(), "b".into()],
        array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0]],
    )
    .unwrap();
    assert!(matches!(
        pca.fit(&degenerate),
        Err(FactorError::Validation(_))
    ));

    // The earlier fit is still intact.
    assert_eq!(pca.eigenvalues().unwrap(), eigenvalues_before);
    assert_eq!(pca.n_features_in().unwrap(), 3);
}

#[test]
fn supplementary_columns_are_ignored_for_row_projections() {
    let full = table_4x3();
    let fit_only = full.select(&["a".into(), "b".into()]).unwrap();

    let mut pca = Pca::new().with_n_components(2);
    pca.fit(&fit_only).unwrap();

    let with_extra = pca.row_coordinates(&full).unwrap();
    let without_extra = pca.row_coordinates(&fit_only).unwrap();
    assert_abs_diff_eq!(with_extra, without_extra, epsilon = 1e-12);
}

#[test]
fn supplementary_columns_get_their_own_column_projection() {
    let full = table_4x3();
    let fit_only = full.select(&["a".into(), "b".into()]).unwrap();

    let mut pca = Pca::new().with_n_components(2);
    pca.fit(&fit_only).unwrap();

    let coordinates = pca.column_coordinates(&full).unwrap();
    // Two fit-time columns plus the supplementary one.
    assert_eq!(coordinates.dim(), (3, 2));
}

#[test]
fn transform_is_an_alias_for_row_coordinates() {
    let table = table_4x3();
    let mut pca = Pca::new().with_n_components(2);
    pca.fit(&table).unwrap();

    assert_abs_diff_eq!(
        pca.transform(&table).unwrap(),
        pca.row_coordinates(&table).unwrap(),
        epsilon = 1e-15
    );
}

#[test]
fn check_input_rejects_non_finite_values() {
    let table = Table::new(
        vec!["a".into(), "b".into()],
        array![[1.0, 2.0], [f64::NAN, 0.0], [3.0, 4.0]],
    )
    .unwrap();
    let mut pca = Pca::new();
    assert!(matches!(pca.fit(&table), Err(FactorError::Validation(_))));
}

#[test]
fn too_many_components_is_a_configuration_error() {
    let table = table_4x3();
    let mut pca = Pca::new().with_n_components(4);
    assert!(matches!(
        pca.fit(&table),
        Err(FactorError::Configuration(_))
    ));
}

#[test]
fn randomized_engine_agrees_with_the_exact_engine() {
    let table = random_table(40, 8, 13);

    let mut exact = Pca::new().with_n_components(2);
    exact.fit(&table).unwrap();

    let mut randomized = Pca::new()
        .with_n_components(2)
        .with_engine(SvdEngine::Randomized)
        .with_n_iter(7)
        .with_random_state(Some(99));
    randomized.fit(&table).unwrap();

    let exact_eigenvalues = exact.eigenvalues().unwrap();
    let randomized_eigenvalues = randomized.eigenvalues().unwrap();
    for (a, b) in exact_eigenvalues.iter().zip(randomized_eigenvalues.iter()) {
        assert_relative_eq!(a, b, max_relative = 1e-6);
    }
}

#[test]
fn unscaled_fit_projects_raw_values() {
    let table = table_4x3();
    let mut pca = Pca::new()
        .with_rescale_with_mean(false)
        .with_rescale_with_std(false)
        .with_n_components(2);
    pca.fit(&table).unwrap();

    // Without a scaler the projection is X·Vᵀ on the raw values.
    let coordinates = pca.row_coordinates(&table).unwrap();
    assert_eq!(coordinates.dim(), (4, 2));
    let fast = {
        let mut refit = Pca::new()
            .with_rescale_with_mean(false)
            .with_rescale_with_std(false)
            .with_n_components(2);
        refit.fit_transform(&table).unwrap()
    };
    for (a, b) in coordinates.iter().zip(fast.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-8);
    }
}

#[test]
fn eigenvalue_summary_is_consistent() {
    let table = random_table(10, 4, 14);
    let mut pca = Pca::new().with_n_components(3);
    pca.fit(&table).unwrap();

    let summary = pca.eigenvalue_summary().unwrap();
    assert_eq!(summary.len(), 3);
    let eigenvalues = pca.eigenvalues().unwrap();
    for (j, entry) in summary.iter().enumerate() {
        assert_eq!(entry.component, j);
        assert_abs_diff_eq!(entry.eigenvalue, eigenvalues[j], epsilon = 1e-15);
    }
    assert!(summary[2].cumulative_percentage_of_variance <= 1.0 + 1e-12);
}
