//! Dispatcher phase machine and ownership tests

use super::*;
use crate::host::{ObjectKind, RecordingHost};
use crate::marshal::{keywords, Coercion};
use crate::session::{Module, SessionOptions};
use crate::testing;
use serde_json::json;

fn open(host: &RecordingHost) -> Session<'_> {
    Session::open(host, &SessionOptions::default()).unwrap()
}

#[test]
fn test_plot_call_walks_every_phase() {
    let _guard = testing::lock();
    let host = RecordingHost::new();
    let session = open(&host);
    let baseline = host.live_objects();
    {
        let marshal = Marshaller::new(&session);
        let args = marshal
            .args()
            .arg(&[1.0, 2.0, 3.0])
            .unwrap()
            .arg(&[1.0, 4.0, 9.0])
            .unwrap()
            .into_tuple()
            .unwrap();
        let kwargs = marshal
            .keyword_map(&keywords([("label", "squares")]), &[])
            .unwrap();

        let pyplot = session.module(Module::Pyplot).unwrap();
        let mut dispatcher = Dispatcher::new(&session, CallDescriptor::new("plot", pyplot));
        dispatcher.resolve().unwrap();
        dispatcher.invoke(Some(&args), Some(&kwargs)).unwrap();

        assert_eq!(dispatcher.result().unwrap().kind(), ObjectKind::None);
        assert_eq!(
            dispatcher.history(),
            &[Phase::Unresolved, Phase::Resolved, Phase::Invoked, Phase::Completed]
        );
    }

    let record = host.last_call().unwrap();
    assert_eq!(record.callable, "plot");
    assert_eq!(record.args, vec![json!([1.0, 2.0, 3.0]), json!([1.0, 4.0, 9.0])]);
    assert_eq!(record.kwarg("label"), Some(&json!("squares")));

    assert_eq!(host.live_objects(), baseline);
    assert!(host.violations().is_empty());
}

#[test]
fn test_unknown_symbol_fails_resolve() {
    let _guard = testing::lock();
    let host = RecordingHost::new();
    let session = open(&host);
    let pyplot = session.module(Module::Pyplot).unwrap();

    let mut dispatcher = Dispatcher::new(&session, CallDescriptor::new("no_such_function", pyplot));
    let err = dispatcher.resolve().unwrap_err();
    assert!(matches!(err, Error::SymbolNotFound { ref name, .. } if name == "no_such_function"));
    assert_eq!(dispatcher.phase(), Phase::Failed);

    // No retry and no invoke after a failed resolve.
    assert_eq!(
        dispatcher.resolve().unwrap_err(),
        Error::InvalidState {
            operation: "resolve",
            phase: Phase::Failed
        }
    );
    assert_eq!(
        dispatcher.invoke(None, None).unwrap_err(),
        Error::InvalidState {
            operation: "invoke",
            phase: Phase::Failed
        }
    );
    assert!(host.calls().is_empty());
}

#[test]
fn test_invoke_before_resolve() {
    let _guard = testing::lock();
    let host = RecordingHost::new();
    let session = open(&host);
    let pyplot = session.module(Module::Pyplot).unwrap();

    let mut dispatcher = Dispatcher::new(&session, CallDescriptor::new("show", pyplot));
    let err = dispatcher.invoke(None, None).unwrap_err();
    assert_eq!(
        err,
        Error::InvalidState {
            operation: "invoke",
            phase: Phase::Unresolved
        }
    );
    assert!(matches!(dispatcher.result(), Err(Error::InvalidState { .. })));
}

#[test]
fn test_invoke_twice_is_rejected() {
    let _guard = testing::lock();
    let host = RecordingHost::new();
    let session = open(&host);
    let pyplot = session.module(Module::Pyplot).unwrap();

    let mut dispatcher = Dispatcher::new(&session, CallDescriptor::new("show", pyplot));
    dispatcher.resolve().unwrap();
    dispatcher.invoke(None, None).unwrap();
    assert!(matches!(
        dispatcher.invoke(None, None),
        Err(Error::InvalidState {
            phase: Phase::Completed,
            ..
        })
    ));
    assert_eq!(host.calls().len(), 1);
}

#[test]
fn test_runtime_error_becomes_call_failed() {
    let _guard = testing::lock();
    let host = RecordingHost::new().with_failure("savefig", "OSError: read-only file system");
    let session = open(&host);
    let baseline = host.live_objects();
    {
        let pyplot = session.module(Module::Pyplot).unwrap();
        let args = Marshaller::new(&session)
            .args()
            .arg("out.png")
            .unwrap()
            .into_tuple()
            .unwrap();
        let mut dispatcher = Dispatcher::new(&session, CallDescriptor::new("savefig", pyplot));
        dispatcher.resolve().unwrap();
        let err = dispatcher.invoke(Some(&args), None).unwrap_err();

        assert_eq!(
            err,
            Error::CallFailed {
                name: "savefig".to_string(),
                reason: Some("OSError: read-only file system".to_string()),
            }
        );
        assert_eq!(
            dispatcher.history(),
            &[Phase::Unresolved, Phase::Resolved, Phase::Invoked, Phase::Failed]
        );
    }
    assert_eq!(host.live_objects(), baseline);
}

#[test]
fn test_malformed_arguments_never_reach_the_runtime() {
    let _guard = testing::lock();
    let host = RecordingHost::new();
    let session = open(&host);
    let baseline = host.live_objects();
    {
        let marshal = Marshaller::new(&session);
        let pyplot = session.module(Module::Pyplot).unwrap();
        let list_args = marshal.args().arg(&[1.0, 2.0]).unwrap().into_list().unwrap();
        let text = marshal.scalar("label").unwrap();
        let tuple_args = marshal.args().arg(&[1.0, 2.0]).unwrap().into_tuple().unwrap();

        let mut dispatcher = Dispatcher::new(&session, CallDescriptor::new("plot", pyplot));
        dispatcher.resolve().unwrap();
        assert_eq!(
            dispatcher.invoke(Some(&list_args), None).unwrap_err(),
            Error::TypeMismatch {
                expected: "argument tuple",
                found: ObjectKind::List,
                reason: None,
            }
        );
        assert_eq!(dispatcher.phase(), Phase::Failed);
        assert_eq!(dispatcher.history(), &[Phase::Unresolved, Phase::Resolved, Phase::Failed]);

        let mut dispatcher = Dispatcher::new(&session, CallDescriptor::new("plot", pyplot));
        dispatcher.resolve().unwrap();
        assert_eq!(
            dispatcher.invoke(Some(&tuple_args), Some(&text)).unwrap_err(),
            Error::TypeMismatch {
                expected: "keyword dict",
                found: ObjectKind::Str,
                reason: None,
            }
        );
        assert_eq!(dispatcher.phase(), Phase::Failed);
    }
    assert!(host.calls().is_empty());
    assert!(host.take_error().is_none());
    assert_eq!(host.live_objects(), baseline);
    assert!(host.violations().is_empty());
}

#[test]
fn test_keyword_only_call_gets_empty_tuple() {
    let _guard = testing::lock();
    let host = RecordingHost::new();
    let session = open(&host);
    let pyplot = session.module(Module::Pyplot).unwrap();

    let kwargs = Marshaller::new(&session)
        .keyword_map(&keywords([("alpha", "0.3")]), &[("alpha", Coercion::Float)])
        .unwrap();
    call(&session, CallDescriptor::new("legend", pyplot), None, Some(&kwargs)).unwrap();

    let record = host.last_call().unwrap();
    assert!(record.args.is_empty());
    assert_eq!(record.kwarg("alpha"), Some(&json!(0.3)));
}

#[test]
fn test_promoted_result_outlives_dispatcher() {
    let _guard = testing::lock();
    let host = RecordingHost::new();
    let session = open(&host);
    let pyplot = session.module(Module::Pyplot).unwrap();

    let axes = {
        let mut dispatcher = Dispatcher::new(&session, CallDescriptor::new("gca", pyplot));
        dispatcher.resolve().unwrap();
        dispatcher.invoke(None, None).unwrap();
        let axes = dispatcher.promote_result().unwrap();
        assert_eq!(axes.refcount(), 2);
        axes
    };
    assert_eq!(axes.refcount(), 1);
    assert_eq!(axes.kind(), ObjectKind::Other);
}

#[test]
fn test_closed_session_is_not_live() {
    let _guard = testing::lock();
    let host = RecordingHost::new();
    let mut session = open(&host);
    session.close();
    assert_eq!(
        session.module(Module::Pyplot).unwrap_err(),
        Error::SessionNotInitialized
    );
}
