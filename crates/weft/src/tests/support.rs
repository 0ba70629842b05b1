//! Shared fixtures for weft's unit and behaviour tests.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::context::{InvocationContext, Streams};
use crate::host;
use crate::program::Program;
use crate::tree::CommandTree;
use crate::tree::builder;

/// In-memory writer whose contents stay readable after the streams it was
/// handed to have been dropped.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Captured standard output and error.
#[derive(Debug, Clone, Default)]
pub(crate) struct Captured {
    pub(crate) out: SharedBuffer,
    pub(crate) err: SharedBuffer,
}

impl Captured {
    pub(crate) fn streams(&self) -> Streams {
        Streams::new(self.out.clone(), self.err.clone())
    }
}

/// Builds `program` and parses `args` (without the program name) straight
/// into an invocation context for the matched command.
pub(crate) fn parse(program: &Program, args: &[&str]) -> InvocationContext {
    parse_tree(&Arc::new(builder::build(program).expect("tree builds")), args)
}

/// Parses `args` against an already built tree.
pub(crate) fn parse_tree(tree: &Arc<CommandTree>, args: &[&str]) -> InvocationContext {
    let tree = Arc::clone(tree);
    let matches = host::build_command(&tree)
        .try_get_matches_from(std::iter::once(tree.program_name()).chain(args.iter().copied()))
        .expect("arguments parse");
    let (names, chain) = host::matched_path(&matches);
    let path: Vec<&str> = names.iter().map(String::as_str).collect();
    let node = tree.find(&path).expect("matched command exists").id();
    InvocationContext::new(
        tree,
        node,
        chain,
        Streams::sink().console(),
        CancellationToken::new(),
    )
}
