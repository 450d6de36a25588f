//! Session behaviour tests.

use super::*;
use crate::models::NodeKind;
use crate::runner::ScriptInvocation;
use crate::test_support::{assert_buffers_consistent, bare_session, sss, workspace};


type RunResult = Result<Vec<String>, ScriptFailure>;

/// Runner driven by a closure, for exercising the run pipeline.
struct FnRunner<F>(F);

impl<F> ScriptRunner for FnRunner<F>
where
    F: FnMut(&mut Tree, ScriptInvocation<'_>) -> RunResult,
{
    fn run(
        &mut self,
        world: &mut Tree,
        script: ScriptInvocation<'_>,
    ) -> RunResult {
        (self.0)(world, script)
    }
}

fn add_script(session: &mut Session, parent: &NodePath, name: &str, source: &str) -> NodePath {
    session
        .add_node(parent, Node::script(name, source))
        .expect("add script")
}

fn drain(rx: &Receiver<SessionEvent>) -> Vec<SessionEvent> {
    rx.try_iter().collect()
}
