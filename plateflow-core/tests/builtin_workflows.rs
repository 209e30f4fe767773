use plateflow_core::activation::StrategyKind;
use plateflow_core::file::{Feature, File};
use plateflow_core::file_state::FileState;
use plateflow_core::settings::{Settings, WorkflowSettings};
use plateflow_core::workflow::{ReconstructableWorkflow, ReconstructionWorkflow, WorkflowTag};
use rstest::rstest;


use fixture::{coastline_file, rotation_file, Fixture};

#[test]
fn test_defaults_register_both_workflows() {
    let (mut fixture, builtins) = Fixture::with_builtins(&Settings::default());
    let reconstructable = builtins.reconstructable.unwrap();
    let reconstruction = builtins.reconstruction.unwrap();

    assert_eq!(
        fixture.state.workflow_tags(),
        vec![
            ReconstructionWorkflow::workflow_tag(),
            ReconstructableWorkflow::workflow_tag()
        ]
    );

    let coastlines = fixture.load(coastline_file("coastlines.gpml"));
    let rotations = fixture.load(rotation_file("global.rot"));

    assert_eq!(reconstructable.held_files(), vec![coastlines]);
    assert_eq!(reconstructable.active_files(), vec![coastlines]);
    assert_eq!(reconstruction.held_files(), vec![rotations]);
    assert_eq!(fixture.active("reconstruction"), vec![rotations]);
}

#[test]
fn test_only_one_rotation_model_is_active_by_default() {
    let (mut fixture, builtins) = Fixture::with_builtins(&Settings::default());
    let reconstruction = builtins.reconstruction.unwrap();

    let first = fixture.load(rotation_file("first.rot"));
    let second = fixture.load(rotation_file("second.rot"));

    assert_eq!(reconstruction.held_files(), vec![first, second]);
    assert_eq!(reconstruction.active_files(), vec![second]);
    assert_eq!(fixture.active("reconstruction"), vec![second]);
}

#[test]
fn test_mixed_file_joins_both_workflows() {
    let (mut fixture, _builtins) = Fixture::with_builtins(&Settings::default());
    let mixed = fixture.load(File::from_path(
        "mixed.gpml",
        vec![
            Feature::new("gpml:TotalReconstructionSequence"),
            Feature::new("gpml:Isochron").with_plate_id(701),
        ],
    ));

    let file = fixture.state.file(mixed).unwrap();
    assert!(file.is_active(&WorkflowTag::new("reconstruction")));
    assert!(file.is_active(&WorkflowTag::new("reconstructable")));
}

#[test]
fn test_reclassified_file_moves_workflows() {
    let (mut fixture, builtins) = Fixture::with_builtins(&Settings::default());
    let reconstructable = builtins.reconstructable.unwrap();
    let reconstruction = builtins.reconstruction.unwrap();

    let file = fixture.load(coastline_file("data.gpml"));
    fixture
        .state
        .changed_file(file, rotation_file("data.gpml"))
        .unwrap();

    assert!(reconstructable.held_files().is_empty());
    assert!(reconstructable.active_files().is_empty());
    assert_eq!(reconstruction.active_files(), vec![file]);
    assert!(fixture.active("reconstructable").is_empty());
}

#[test]
fn test_removed_file_is_released() {
    let (mut fixture, builtins) = Fixture::with_builtins(&Settings::default());
    let reconstruction = builtins.reconstruction.unwrap();

    let file = fixture.load(rotation_file("global.rot"));
    fixture.state.remove_file(file).unwrap();

    assert!(reconstruction.held_files().is_empty());
    assert!(reconstruction.active_files().is_empty());
}

#[test]
fn test_disabled_workflow_is_not_registered() {
    let mut settings = Settings::default();
    settings.set_workflow(
        &ReconstructableWorkflow::workflow_tag(),
        WorkflowSettings {
            enabled: false,
            strategy: StrategyKind::Default,
        },
    );

    let (mut fixture, builtins) = Fixture::with_builtins(&settings);
    assert!(builtins.reconstructable.is_none());
    assert!(builtins.reconstruction.is_some());

    let file = fixture.load(coastline_file("coastlines.gpml"));
    assert!(fixture.state.file(file).unwrap().workflow_tags().next().is_none());
}

#[rstest]
#[case(StrategyKind::Default, 2)]
#[case(StrategyKind::MutuallyExclusive, 1)]
fn test_reconstruction_strategy_from_settings(
    #[case] strategy: StrategyKind,
    #[case] expected_active: usize,
) {
    let mut settings = Settings::default();
    settings.set_workflow(
        &ReconstructionWorkflow::workflow_tag(),
        WorkflowSettings {
            enabled: true,
            strategy,
        },
    );

    let (mut fixture, _builtins) = Fixture::with_builtins(&settings);
    fixture.load(rotation_file("first.rot"));
    fixture.load(rotation_file("second.rot"));

    assert_eq!(fixture.active("reconstruction").len(), expected_active);
}

#[test]
fn test_from_settings_registers_builtins() {
    let (mut state, builtins) = FileState::from_settings(&Settings::default());
    let file = state.add_file(rotation_file("global.rot"));

    assert_eq!(state.workflow_tags().len(), 2);
    assert_eq!(builtins.reconstruction.unwrap().active_files(), vec![file]);
}

#[test]
fn test_unregistered_builtin_drops_its_active_files() {
    let (mut fixture, builtins) = Fixture::with_builtins(&Settings::default());
    let reconstruction = builtins.reconstruction.unwrap();
    let file = fixture.load(rotation_file("global.rot"));
    assert_eq!(reconstruction.active_files(), vec![file]);

    assert!(fixture
        .state
        .unregister_workflow(&ReconstructionWorkflow::workflow_tag()));

    assert!(reconstruction.active_files().is_empty());
    assert!(!fixture
        .state
        .file(file)
        .unwrap()
        .is_attached(&ReconstructionWorkflow::workflow_tag()));
}
