//! Configuration files: serde round trips, defaults and validation.

use sverdrup::{
    ConfigError, EastFluxEdge, GridConfig, IdemixConfig, ModelConfig, SolverConfig, TkeConfig,
};

#[test]
fn test_json_round_trip() {
    let config = ModelConfig::default()
        .with_grid(GridConfig::new(40, 30, 15).with_cyclic_x(true))
        .with_solver(SolverConfig::default().with_tolerance(1e-9))
        .with_tke(TkeConfig::default().with_tke(true).with_mxl_choice(2))
        .with_idemix(IdemixConfig::default().with_idemix(true));

    let text = serde_json::to_string_pretty(&config).unwrap();
    let back: ModelConfig = serde_json::from_str(&text).unwrap();
    assert_eq!(back, config);
    assert!(back.validate().is_ok());
}

#[test]
fn test_partial_file_uses_defaults() {
    let text = r#"{
        "grid": { "nx": 12, "ny": 8, "nz": 5, "enable_cyclic_x": true },
        "solver": { "tolerance": 1e-8 },
        "tke": { "enable_tke": true }
    }"#;
    let config: ModelConfig = serde_json::from_str(text).unwrap();

    assert_eq!((config.grid.nx, config.grid.ny, config.grid.nz), (12, 8, 5));
    assert!(config.grid.enable_cyclic_x);
    assert_eq!(config.grid.radius, GridConfig::default().radius);
    assert_eq!(config.solver.tolerance, 1e-8);
    assert_eq!(
        config.solver.max_iterations,
        SolverConfig::default().max_iterations
    );
    assert!(config.tke.enable_tke);
    assert_eq!(config.tke.c_eps, TkeConfig::default().c_eps);
    assert_eq!(config.idemix, IdemixConfig::default());
    assert!(config.validate().is_ok());
}

#[test]
fn test_east_flux_edge_names() {
    assert_eq!(
        serde_json::to_string(&EastFluxEdge::AsObserved).unwrap(),
        "\"as_observed\""
    );
    let edge: EastFluxEdge = serde_json::from_str("\"outermost\"").unwrap();
    assert_eq!(edge, EastFluxEdge::Outermost);
    assert_eq!(EastFluxEdge::AsObserved.zeroed_face(20), Some(15));
    assert_eq!(EastFluxEdge::Outermost.zeroed_face(20), Some(19));
}

#[test]
fn test_bad_values_fail_validation() {
    let text = r#"{ "tke": { "mxl_choice": 7 } }"#;
    let config: ModelConfig = serde_json::from_str(text).unwrap();
    assert_eq!(
        config.validate(),
        Err(ConfigError::UnsupportedMixingLength(7))
    );

    let config = ModelConfig::default().with_solver(SolverConfig::default().with_tolerance(-1.0));
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidParameter { .. })
    ));
}
