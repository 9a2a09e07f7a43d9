mod common;

use common::*;
use formweave_engine::*;
use formweave_model::*;
use pretty_assertions::assert_eq;
use serde_json::json;

struct Flow {
    fx: Fixture,
    wizard: WizardComposition,
    forms: Vec<FormComposition>,
}

/// Three steps asking for `first`, `second` and `third`, with the
/// `db_store` wizard handler attached.
fn flow() -> Flow {
    let fx = fixture();
    let composer = fx.engine.composer();
    let wizard = composer.create_wizard(&fx.owner, "Signup").unwrap();
    let forms: Vec<FormComposition> = ["first", "second", "third"]
        .iter()
        .map(|field| {
            let form = fx.form(&format!("Step {field}"), &[("text", *field, true)], &[]);
            composer.add_wizard_step(&fx.owner, wizard.id, form.id).unwrap();
            form
        })
        .collect();
    composer
        .add_wizard_handler(&fx.owner, wizard.id, "db_store", None)
        .unwrap()
        .saved()
        .unwrap();
    Flow { fx, wizard, forms }
}

fn answer(field: &str) -> FormInput {
    FormInput::new().with(field, format!("{field}-answer"))
}

// ================================================================
// Happy path
// ================================================================

#[test]
fn completes_and_runs_handlers_once() {
    let Flow { fx, wizard, .. } = flow();
    let wizards = fx.engine.wizards();
    let (_, mut session) = wizards.start(wizard.slug.as_str(), &fx.request()).unwrap();
    assert_eq!(session.state(), WizardState::AwaitingStep(0));

    let outcome = wizards.submit_step(&mut session, &fx.request(), answer("first")).unwrap();
    assert!(matches!(outcome, StepOutcome::Advanced { step: 1 }));
    wizards.submit_step(&mut session, &fx.request(), answer("second")).unwrap();
    assert_eq!(session.state(), WizardState::AwaitingStep(2));
    assert!(logged(&fx.log).is_empty());

    let outcome = wizards.submit_step(&mut session, &fx.request(), answer("third")).unwrap();
    let StepOutcome::Completed { steps, report } = outcome else {
        panic!("expected completion");
    };
    assert!(report.is_clean());
    assert_eq!(steps.len(), 3);
    assert_eq!(steps[1].data["second"], json!("second-answer"));
    assert_eq!(logged(&fx.log), vec!["db_store:3steps:first,second,third"]);

    assert!(session.is_done());
    assert_eq!(session.stored_steps(), 0);
}

#[test]
fn invalid_step_is_repeated() {
    let Flow { fx, wizard, .. } = flow();
    let wizards = fx.engine.wizards();
    let (_, mut session) = wizards.start(wizard.slug.as_str(), &fx.request()).unwrap();

    let outcome = wizards.submit_step(&mut session, &fx.request(), FormInput::new()).unwrap();
    let StepOutcome::Invalid { step, form } = outcome else {
        panic!("expected invalid step");
    };
    assert_eq!(step, 0);
    assert_eq!(form.field_errors("first"), [REQUIRED_MESSAGE.to_string()]);
    assert_eq!(session.state(), WizardState::AwaitingStep(0));
}

// ================================================================
// Revalidation
// ================================================================

#[test]
fn stale_step_fails_revalidation_without_running_handlers() {
    let Flow { fx, wizard, forms } = flow();
    let wizards = fx.engine.wizards();
    let (_, mut session) = wizards.start(wizard.slug.as_str(), &fx.request()).unwrap();

    wizards.submit_step(&mut session, &fx.request(), answer("first")).unwrap();
    wizards.submit_step(&mut session, &fx.request(), answer("second")).unwrap();

    // The second form gains a required field after its data was stored.
    fx.store_element(&forms[1], "text", "extra", true);

    let outcome = wizards.submit_step(&mut session, &fx.request(), answer("third")).unwrap();
    let StepOutcome::RevalidationFailed { step, form } = outcome else {
        panic!("expected revalidation failure");
    };
    assert_eq!(step, 1);
    assert_eq!(form.field_errors("extra"), [REQUIRED_MESSAGE.to_string()]);
    assert_eq!(session.state(), WizardState::RevalidationFailed(1));
    assert!(logged(&fx.log).is_empty());

    let view = wizards.current_form(&session, &fx.request()).unwrap();
    assert_eq!(view.index, 1);
    assert_eq!(view.form.field_errors("extra"), [REQUIRED_MESSAGE.to_string()]);

    let redo = answer("second").with("extra", "now filled");
    let outcome = wizards.submit_step(&mut session, &fx.request(), redo).unwrap();
    assert!(matches!(outcome, StepOutcome::Advanced { step: 2 }));
    let outcome = wizards.submit_step(&mut session, &fx.request(), answer("third")).unwrap();
    assert!(matches!(outcome, StepOutcome::Completed { .. }));
    assert_eq!(logged(&fx.log).len(), 1);
}

// ================================================================
// Navigation and sessions
// ================================================================

#[test]
fn back_prefills_stored_input() {
    let Flow { fx, wizard, .. } = flow();
    let wizards = fx.engine.wizards();
    let (_, mut session) = wizards.start(wizard.slug.as_str(), &fx.request()).unwrap();
    wizards.submit_step(&mut session, &fx.request(), answer("first")).unwrap();

    assert_eq!(session.back().unwrap(), 0);
    let view = wizards.current_form(&session, &fx.request()).unwrap();
    assert_eq!(view.total, 3);
    assert_eq!(view.form.value("first"), Some(&json!("first-answer")));
    assert!(!view.form.is_bound());
}

#[test]
fn session_survives_serialization_between_requests() {
    let Flow { fx, wizard, .. } = flow();
    let wizards = fx.engine.wizards();
    let (_, mut session) = wizards.start(wizard.slug.as_str(), &fx.request()).unwrap();
    wizards.submit_step(&mut session, &fx.request(), answer("first")).unwrap();

    let stored = serde_json::to_string(&session).unwrap();
    let mut session: WizardSession = serde_json::from_str(&stored).unwrap();

    wizards.submit_step(&mut session, &fx.request(), answer("second")).unwrap();
    let outcome = wizards.submit_step(&mut session, &fx.request(), answer("third")).unwrap();
    assert!(matches!(outcome, StepOutcome::Completed { .. }));
}

#[test]
fn done_session_rejects_more_input() {
    let Flow { fx, wizard, .. } = flow();
    let wizards = fx.engine.wizards();
    let (_, mut session) = wizards.start(wizard.slug.as_str(), &fx.request()).unwrap();
    for field in ["first", "second", "third"] {
        wizards.submit_step(&mut session, &fx.request(), answer(field)).unwrap();
    }
    let err = wizards
        .submit_step(&mut session, &fx.request(), answer("first"))
        .unwrap_err();
    assert!(matches!(err, EngineError::WizardState(_)));

    session.reset();
    assert_eq!(session.state(), WizardState::AwaitingStep(0));
}

#[test]
fn wizard_without_steps_cannot_start() {
    let fx = fixture();
    let wizard = fx.engine.composer().create_wizard(&fx.owner, "Empty").unwrap();
    let err = fx.engine.wizards().start(wizard.slug.as_str(), &fx.request()).unwrap_err();
    assert!(matches!(err, EngineError::EmptyWizard(_)));
}

#[test]
fn private_wizard_is_hidden_from_anonymous_visitors() {
    let Flow { fx, wizard, .. } = flow();
    let err = fx
        .engine
        .wizards()
        .start(wizard.slug.as_str(), &RequestContext::anonymous())
        .unwrap_err();
    assert!(err.is_not_found());
}
