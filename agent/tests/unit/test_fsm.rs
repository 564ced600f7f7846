//! FSM unit tests

use pushdeploy::deploy::fsm::{DeploymentEvent, DeploymentFsm, DeploymentState, Stage};

fn begin() -> DeploymentFsm {
    let mut fsm = DeploymentFsm::new();
    fsm.process(DeploymentEvent::Begin).unwrap();
    fsm
}

#[test]
fn test_fsm_initial_state() {
    let fsm = DeploymentFsm::new();
    assert_eq!(fsm.state(), &DeploymentState::Pending);
    assert!(fsm.error().is_none());
    assert!(fsm.warnings().is_empty());
    assert!(!fsm.is_finished());
}

#[test]
fn test_stage_order() {
    assert_eq!(Stage::Precondition.next(), Some(Stage::Status));
    assert_eq!(Stage::Fetch.next(), Some(Stage::Stash));
    assert_eq!(Stage::Reset.next(), Some(Stage::Verify));
    assert_eq!(Stage::Clean.next(), None);

    let required: Vec<Stage> = Stage::ALL.into_iter().filter(|s| s.is_required()).collect();
    assert_eq!(required, vec![Stage::Precondition, Stage::Fetch, Stage::Reset]);
}

#[test]
fn test_fsm_fetch_failure_is_terminal() {
    let mut fsm = begin();

    fsm.process(DeploymentEvent::StageSucceeded(Stage::Precondition))
        .unwrap();
    fsm.process(DeploymentEvent::StageSucceeded(Stage::Status))
        .unwrap();
    fsm.process(DeploymentEvent::StageFailed(
        Stage::Fetch,
        "fatal: couldn't find remote ref main".to_string(),
    ))
    .unwrap();

    assert_eq!(fsm.state(), &DeploymentState::Failed(Stage::Fetch));
    assert_eq!(fsm.error(), Some("fatal: couldn't find remote ref main"));
    assert!(fsm.is_finished());

    // Nothing runs after a failed required stage
    assert!(fsm
        .process(DeploymentEvent::StageSucceeded(Stage::Reset))
        .is_err());
}

#[test]
fn test_fsm_best_effort_failures_continue() {
    let mut fsm = begin();

    for stage in Stage::ALL {
        let event = match stage {
            Stage::Stash | Stage::Clean => {
                DeploymentEvent::StageFailed(stage, "No local changes to save".to_string())
            }
            _ => DeploymentEvent::StageSucceeded(stage),
        };
        fsm.process(event).unwrap();
    }

    assert_eq!(fsm.state(), &DeploymentState::Succeeded);
    assert_eq!(fsm.warnings(), &[Stage::Stash, Stage::Clean]);
    assert!(fsm.error().is_none());
}

#[test]
fn test_fsm_rejects_out_of_order_stage() {
    let mut fsm = begin();

    // Reset cannot run before the precondition and fetch
    let result = fsm.process(DeploymentEvent::StageSucceeded(Stage::Reset));
    assert!(result.is_err());
    assert_eq!(fsm.state(), &DeploymentState::Running(Stage::Precondition));
}

#[test]
fn test_fsm_invalid_transition() {
    let mut fsm = DeploymentFsm::new();

    // Cannot finish a stage before the run begins
    let result = fsm.process(DeploymentEvent::StageSucceeded(Stage::Precondition));
    assert!(result.is_err());

    // Cannot begin twice
    let mut fsm = begin();
    assert!(fsm.process(DeploymentEvent::Begin).is_err());
}
