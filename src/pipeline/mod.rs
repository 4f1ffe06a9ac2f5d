//! Task Pipeline (§4.5): an ordered, named list of tasks with conditional
//! and labelled-goto dispatch. `addTask`/`getNextTask`/`setNextTask` are
//! implemented literally; termination, specifically, is additionally
//! encoded as the `Control` sum type returned by the Termination Monitor's
//! checks (Design Notes §9) rather than left as a bare goto.

pub mod context;
pub mod control;
pub mod tasks;

pub use context::SolveContext;
pub use control::Control;

use std::collections::HashMap;

use crate::error::EshResult;

/// A single pipeline stage. `name()` is the stable label other tasks jump to
/// via [`Pipeline::set_next_task`]. `run` may request a jump (implementing
/// both the loop-head `goto` and conditional dispatch) by returning the
/// target task's name.
pub trait Task {
    fn name(&self) -> &'static str;

    fn run(&mut self, ctx: &mut SolveContext) -> EshResult<Option<&'static str>>;
}

/// The named, ordered task list and its cursor (§4.5).
pub struct Pipeline {
    tasks: Vec<Box<dyn Task>>,
    index_by_name: HashMap<&'static str, usize>,
    cursor: usize,
    next_task_override: Option<usize>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            index_by_name: HashMap::new(),
            cursor: 0,
            next_task_override: None,
        }
    }

    /// Appends `task`, indexed by its own stable name.
    pub fn add_task(&mut self, task: Box<dyn Task>) {
        let name = task.name();
        self.index_by_name.insert(name, self.tasks.len());
        self.tasks.push(task);
    }

    /// Jumps to the named task (labelled goto); takes effect on the next
    /// [`Pipeline::get_next_task`] call.
    pub fn set_next_task(&mut self, name: &str) {
        if let Some(&index) = self.index_by_name.get(name) {
            self.next_task_override = Some(index);
        }
    }

    /// Evaluates `predicate` and, if true, jumps to `true_branch_name`;
    /// otherwise falls through to the next task in sequence.
    pub fn conditional(&mut self, predicate: bool, true_branch_name: &str) {
        if predicate {
            self.set_next_task(true_branch_name);
        }
    }

    /// Advances the cursor and returns the next task to run, or `None` once
    /// the list is exhausted without an explicit jump keeping it alive.
    pub fn get_next_task(&mut self) -> Option<usize> {
        let index = self.next_task_override.take().unwrap_or(self.cursor);
        if index >= self.tasks.len() {
            return None;
        }
        self.cursor = index + 1;
        Some(index)
    }

    /// Runs the task at `index`; if it requests a jump, installs it so the
    /// next [`Pipeline::get_next_task`] honors it.
    pub fn run_task(&mut self, index: usize, ctx: &mut SolveContext) -> EshResult<()> {
        if let Some(name) = self.tasks[index].run(ctx)? {
            self.set_next_task(name);
        }
        Ok(())
    }

    pub fn task_name(&self, index: usize) -> &'static str {
        self.tasks[index].name()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        name: &'static str,
        log: std::rc::Rc<std::cell::RefCell<Vec<&'static str>>>,
    }

    impl Task for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn run(&mut self, _ctx: &mut SolveContext) -> EshResult<Option<&'static str>> {
            self.log.borrow_mut().push(self.name);
            Ok(None)
        }
    }

    #[test]
    fn named_goto_jumps_out_of_sequence() {
        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut pipeline = Pipeline::new();
        pipeline.add_task(Box::new(Recorder { name: "A", log: log.clone() }));
        pipeline.add_task(Box::new(Recorder { name: "B", log: log.clone() }));
        pipeline.add_task(Box::new(Recorder { name: "C", log: log.clone() }));

        let first = pipeline.get_next_task().unwrap();
        assert_eq!(pipeline.task_name(first), "A");
        pipeline.set_next_task("C");
        let second = pipeline.get_next_task().unwrap();
        assert_eq!(pipeline.task_name(second), "C");
        assert!(pipeline.get_next_task().is_none());
    }
}
