//! Call stack reconstruction from instruction fetches.
//!
//! No call instrumentation is available in a Tarmac trace, so calls and
//! returns are inferred from the program counter alone:
//!
//! - **Enter**: the fetch address is a symbol's entry address.
//! - **Exit**: the fetch address left the top frame's range. Frames are popped
//!   until one contains the address (a return, or a tail jump back into an
//!   ancestor) or the stack is empty.
//! - **Neither**: the address is inside the top frame and not an entry.
//!
//! Recovery transitions keep the stack usable on imperfect captures: a fetch
//! inside a known body with an empty stack *adopts* that function as a frame
//! with an unknown caller.

use crate::parser::{EventKind, FetchState, InstructionFetch, TraceEvent};
use crate::tables::{Symbol, SymbolTable};
use crate::utils::error::CallStackAnomaly;
use log::{debug, warn};

/// One live call
#[derive(Debug, Clone)]
pub struct CallFrame<'a> {
    pub symbol: &'a Symbol,
    pub entry_timestamp: Option<u64>,
    /// Active function names from the oldest frame up to and including this one
    pub caller_chain: Vec<&'a str>,
    /// Frame joined mid-body after the capture started or context was lost
    pub adopted: bool,
}

impl<'a> CallFrame<'a> {
    pub fn contains(&self, address: u64) -> bool {
        self.symbol.range.contains(address)
    }
}

/// Call/return decision produced for an instruction fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTransition<'a> {
    Enter {
        symbol: &'a Symbol,
        caller_chain: Vec<&'a str>,
        depth: usize,
        timestamp: Option<u64>,
    },
    Exit {
        symbol: &'a Symbol,
        /// Depth of the frame before it was popped
        depth: usize,
    },
    /// Control is back in `symbol` after one or more exits
    Resume { symbol: &'a Symbol, depth: usize },
    /// `symbol` became the bottom frame without an observed entry
    Adopt {
        symbol: &'a Symbol,
        address: u64,
        depth: usize,
    },
}

/// Everything the tracker decided for one event
#[derive(Debug, Default)]
pub struct Observation<'a> {
    pub transitions: Vec<CallTransition<'a>>,
    pub anomalies: Vec<CallStackAnomaly>,
}

impl<'a> Observation<'a> {
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty() && self.anomalies.is_empty()
    }
}

/// Stateful call/return detector
///
/// The stack is owned here; other components only query it.
#[derive(Debug)]
pub struct CallStackTracker<'a> {
    symbols: &'a SymbolTable,
    stack: Vec<CallFrame<'a>>,
    last_fetch: Option<u64>,
}

impl<'a> CallStackTracker<'a> {
    pub fn new(symbols: &'a SymbolTable) -> Self {
        Self {
            symbols,
            stack: Vec::new(),
            last_fetch: None,
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn current(&self) -> Option<&CallFrame<'a>> {
        self.stack.last()
    }

    /// Read-only view of the live frames, oldest first
    pub fn frames(&self) -> &[CallFrame<'a>] {
        &self.stack
    }

    /// Feed one event in trace order
    ///
    /// Only instruction fetches change state; every other kind yields an
    /// empty observation.
    pub fn observe(&mut self, event: &TraceEvent) -> Observation<'a> {
        let mut observation = Observation::default();

        match &event.kind {
            EventKind::InstructionFetch(fetch) => {
                self.on_fetch(fetch, event.line_number, event.timestamp, &mut observation);
            }
            EventKind::MemoryRead(_)
            | EventKind::MemoryWrite(_)
            | EventKind::RegisterWrite(_)
            | EventKind::Opaque => {}
        }

        observation
    }

    fn on_fetch(
        &mut self,
        fetch: &InstructionFetch,
        line: usize,
        timestamp: Option<u64>,
        observation: &mut Observation<'a>,
    ) {
        let address = fetch.address;
        let previous = self.last_fetch.replace(address);

        if let Some(symbol) = self.symbols.entry_at(address) {
            // The same PC fetched twice in a row is not a second call
            if previous != Some(address) {
                self.enter(symbol, fetch, line, timestamp, observation);
            }
            return;
        }

        let Some(top) = self.stack.last() else {
            if !self.adopt(address, observation)
                && fetch.state == FetchState::Executed
                && fetch.is_return()
            {
                self.pop_frame(address, line, observation);
            }
            return;
        };

        if top.contains(address) {
            return;
        }

        let keep = self
            .stack
            .iter()
            .rposition(|frame| frame.contains(address))
            .map_or(0, |index| index + 1);

        if keep > 0 {
            self.unwind_to(keep, address, line, observation);
            return;
        }

        // Leaving an adopted root is expected: its caller was never known
        let root_adopted = self.stack.first().is_some_and(|frame| frame.adopted);
        let popped = self.stack.len();
        self.unwind_to(0, address, line, observation);

        if !root_adopted {
            let anomaly = CallStackAnomaly::UnreconciledExit {
                address,
                line,
                popped,
            };
            warn!("{}", anomaly);
            observation.anomalies.push(anomaly);
        }

        self.adopt(address, observation);
    }

    fn enter(
        &mut self,
        symbol: &'a Symbol,
        fetch: &InstructionFetch,
        line: usize,
        timestamp: Option<u64>,
        observation: &mut Observation<'a>,
    ) {
        let active = self
            .stack
            .iter()
            .rposition(|frame| frame.symbol.entry == symbol.entry);

        if let Some(index) = active {
            if !fetch.is_prologue() {
                if index + 1 == self.stack.len() {
                    debug!("Branch back to entry of {} at line {}", symbol.name, line);
                    return;
                }

                let anomaly = CallStackAnomaly::ReentryWithoutPrologue {
                    symbol: symbol.name.clone(),
                    address: fetch.address,
                    line,
                };
                warn!("{}", anomaly);
                observation.anomalies.push(anomaly);
                self.unwind_to(index + 1, fetch.address, line, observation);
                return;
            }
        }

        let mut caller_chain = self
            .stack
            .last()
            .map(|frame| frame.caller_chain.clone())
            .unwrap_or_default();
        caller_chain.push(symbol.name.as_str());

        self.stack.push(CallFrame {
            symbol,
            entry_timestamp: timestamp,
            caller_chain: caller_chain.clone(),
            adopted: false,
        });

        debug!("Enter {} at depth {}", symbol.name, self.stack.len());

        observation.transitions.push(CallTransition::Enter {
            symbol,
            caller_chain,
            depth: self.stack.len(),
            timestamp,
        });
    }

    /// Push the function containing `address` as a new root frame
    fn adopt(&mut self, address: u64, observation: &mut Observation<'a>) -> bool {
        debug_assert!(self.stack.is_empty());

        let Some(symbol) = self.symbols.containing(address) else {
            return false;
        };

        debug!("Adopting {} at {:08x}", symbol.name, address);

        self.stack.push(CallFrame {
            symbol,
            entry_timestamp: None,
            caller_chain: vec![symbol.name.as_str()],
            adopted: true,
        });

        observation.transitions.push(CallTransition::Adopt {
            symbol,
            address,
            depth: 1,
        });
        true
    }

    /// Pop frames until `keep` remain, then report where control resumed
    fn unwind_to(
        &mut self,
        keep: usize,
        address: u64,
        line: usize,
        observation: &mut Observation<'a>,
    ) {
        let mut popped = false;

        while self.stack.len() > keep {
            let depth = self.stack.len();
            let Some(frame) = self.pop_frame(address, line, observation) else {
                break;
            };
            debug!("Exit {} from depth {}", frame.symbol.name, depth);
            observation.transitions.push(CallTransition::Exit {
                symbol: frame.symbol,
                depth,
            });
            popped = true;
        }

        if popped {
            if let Some(top) = self.stack.last() {
                observation.transitions.push(CallTransition::Resume {
                    symbol: top.symbol,
                    depth: self.stack.len(),
                });
            }
        }
    }

    /// Pop the top frame; an empty stack is reported, never silently ignored
    fn pop_frame(
        &mut self,
        address: u64,
        line: usize,
        observation: &mut Observation<'a>,
    ) -> Option<CallFrame<'a>> {
        let frame = self.stack.pop();
        if frame.is_none() {
            let anomaly = CallStackAnomaly::StackUnderflow { address, line };
            warn!("{}", anomaly);
            observation.anomalies.push(anomaly);
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;
    use crate::tables::{AddressRange, Symbol};

    fn table() -> SymbolTable {
        SymbolTable::new(vec![
            Symbol::new("main", 0x1000, AddressRange::new(0x1000, 0x1100)),
            Symbol::new("worker", 0x2000, AddressRange::new(0x2000, 0x2100)),
            Symbol::new("leaf", 0x3000, AddressRange::new(0x3000, 0x3010)),
        ])
        .unwrap()
    }

    fn fetch(address: u64, disassembly: &str) -> TraceEvent {
        parse_line(&format!("100 ns IT {:08x} 0000 {}", address, disassembly), 1, None).unwrap()
    }

    fn names<'a>(transitions: &[CallTransition<'a>]) -> Vec<String> {
        transitions
            .iter()
            .map(|t| match t {
                CallTransition::Enter { symbol, .. } => format!("enter {}", symbol.name),
                CallTransition::Exit { symbol, .. } => format!("exit {}", symbol.name),
                CallTransition::Resume { symbol, .. } => format!("resume {}", symbol.name),
                CallTransition::Adopt { symbol, .. } => format!("adopt {}", symbol.name),
            })
            .collect()
    }

    #[test]
    fn test_enter_from_idle() {
        let table = table();
        let mut tracker = CallStackTracker::new(&table);

        let obs = tracker.observe(&fetch(0x1000, "PUSH {r4,lr}"));
        assert_eq!(names(&obs.transitions), vec!["enter main"]);
        assert_eq!(tracker.depth(), 1);
        assert_eq!(tracker.current().unwrap().caller_chain, vec!["main"]);
    }

    #[test]
    fn test_call_and_return() {
        let table = table();
        let mut tracker = CallStackTracker::new(&table);

        tracker.observe(&fetch(0x1000, "PUSH {r4,lr}"));
        tracker.observe(&fetch(0x1002, "BL worker"));
        let obs = tracker.observe(&fetch(0x2000, "PUSH {r4,lr}"));
        match &obs.transitions[0] {
            CallTransition::Enter { caller_chain, depth, .. } => {
                assert_eq!(caller_chain, &vec!["main", "worker"]);
                assert_eq!(*depth, 2);
            }
            other => panic!("unexpected transition {:?}", other),
        }

        assert!(tracker.observe(&fetch(0x2002, "POP {r4,pc}")).is_empty());

        let obs = tracker.observe(&fetch(0x1006, "MOVS r0,#0"));
        assert_eq!(names(&obs.transitions), vec!["exit worker", "resume main"]);
        assert!(obs.anomalies.is_empty());
        assert_eq!(tracker.depth(), 1);
    }

    #[test]
    fn test_tail_jump_into_ancestor_pops_all_nested() {
        let table = table();
        let mut tracker = CallStackTracker::new(&table);

        tracker.observe(&fetch(0x1000, "PUSH {r4,lr}"));
        tracker.observe(&fetch(0x2000, "PUSH {r4,lr}"));
        tracker.observe(&fetch(0x3000, "MOVS r0,#1"));

        let obs = tracker.observe(&fetch(0x1008, "B 0x1010"));
        assert_eq!(
            names(&obs.transitions),
            vec!["exit leaf", "exit worker", "resume main"]
        );
        assert_eq!(tracker.depth(), 1);
    }

    #[test]
    fn test_recursion_with_prologue_pushes_new_frame() {
        let table = table();
        let mut tracker = CallStackTracker::new(&table);

        tracker.observe(&fetch(0x2000, "PUSH {r4,lr}"));
        tracker.observe(&fetch(0x2010, "BL worker"));
        let obs = tracker.observe(&fetch(0x2000, "PUSH {r4,lr}"));

        assert_eq!(names(&obs.transitions), vec!["enter worker"]);
        assert_eq!(tracker.depth(), 2);
        assert_eq!(
            tracker.current().unwrap().caller_chain,
            vec!["worker", "worker"]
        );
    }

    #[test]
    fn test_branch_to_own_entry_without_prologue_is_a_loop() {
        let table = table();
        let mut tracker = CallStackTracker::new(&table);

        tracker.observe(&fetch(0x3000, "MOVS r0,#1"));
        tracker.observe(&fetch(0x3002, "B 0x3000"));
        let obs = tracker.observe(&fetch(0x3000, "MOVS r0,#1"));

        assert!(obs.is_empty());
        assert_eq!(tracker.depth(), 1);
    }

    #[test]
    fn test_reentry_without_prologue_unwinds() {
        let table = table();
        let mut tracker = CallStackTracker::new(&table);

        tracker.observe(&fetch(0x3000, "MOVS r0,#1"));
        tracker.observe(&fetch(0x2000, "PUSH {r4,lr}"));
        let obs = tracker.observe(&fetch(0x3000, "MOVS r0,#1"));

        assert_eq!(names(&obs.transitions), vec!["exit worker", "resume leaf"]);
        assert_eq!(obs.anomalies.len(), 1);
        assert_eq!(obs.anomalies[0].kind(), "reentry_without_prologue");
        assert_eq!(tracker.depth(), 1);
    }

    #[test]
    fn test_refetch_of_entry_is_not_a_call() {
        let table = table();
        let mut tracker = CallStackTracker::new(&table);

        tracker.observe(&fetch(0x2000, "PUSH {r4,lr}"));
        let obs = tracker.observe(&fetch(0x2000, "PUSH {r4,lr}"));
        assert!(obs.is_empty());
        assert_eq!(tracker.depth(), 1);
    }

    #[test]
    fn test_unknown_address_empties_stack_with_anomaly() {
        let table = table();
        let mut tracker = CallStackTracker::new(&table);

        tracker.observe(&fetch(0x1000, "PUSH {r4,lr}"));
        tracker.observe(&fetch(0x2000, "PUSH {r4,lr}"));
        let obs = tracker.observe(&fetch(0x9000, "NOP"));

        assert_eq!(names(&obs.transitions), vec!["exit worker", "exit main"]);
        assert_eq!(obs.anomalies.len(), 1);
        assert_eq!(obs.anomalies[0].kind(), "unreconciled_exit");
        assert_eq!(tracker.depth(), 0);
    }

    #[test]
    fn test_adopt_mid_function_on_truncated_capture() {
        let table = table();
        let mut tracker = CallStackTracker::new(&table);

        let obs = tracker.observe(&fetch(0x2040, "LDR r0,[r1,#0]"));
        assert_eq!(names(&obs.transitions), vec!["adopt worker"]);
        assert!(tracker.current().unwrap().adopted);

        // Returning out of an adopted root is expected, not an anomaly
        let obs = tracker.observe(&fetch(0x1040, "MOVS r0,#0"));
        assert_eq!(names(&obs.transitions), vec!["exit worker", "adopt main"]);
        assert!(obs.anomalies.is_empty());
    }

    #[test]
    fn test_return_with_empty_stack_is_underflow() {
        let table = table();
        let mut tracker = CallStackTracker::new(&table);

        let obs = tracker.observe(&fetch(0x8000, "BX lr"));
        assert!(obs.transitions.is_empty());
        assert_eq!(obs.anomalies.len(), 1);
        assert_eq!(obs.anomalies[0].kind(), "stack_underflow");
        assert_eq!(tracker.depth(), 0);
    }

    #[test]
    fn test_non_fetch_events_do_not_change_state() {
        let table = table();
        let mut tracker = CallStackTracker::new(&table);

        let event = parse_line("100 ns MW4_D 00001000 00000001", 1, None).unwrap();
        assert!(tracker.observe(&event).is_empty());
        assert_eq!(tracker.depth(), 0);
    }
}
