//! Matches memory and register events against the watch list.

use super::annotation::{AccessAnnotation, AccessDirection};
use crate::parser::{EventKind, TraceEvent};
use crate::tables::WatchList;

/// Stateless watch-list matcher
#[derive(Debug, Clone, Copy)]
pub struct AccessWatcher<'a> {
    watch: &'a WatchList,
}

impl<'a> AccessWatcher<'a> {
    pub fn new(watch: &'a WatchList) -> Self {
        Self { watch }
    }

    /// Annotation for a watched access, `None` for everything else
    ///
    /// Register writes are matched by register name first, then by the
    /// alias the trace printed after the value.
    pub fn inspect(&self, event: &TraceEvent) -> Option<AccessAnnotation> {
        let (label, direction, value) = match &event.kind {
            EventKind::MemoryRead(access) => (
                self.watch.address_label(access.address)?,
                AccessDirection::Read,
                access.value,
            ),
            EventKind::MemoryWrite(access) => (
                self.watch.address_label(access.address)?,
                AccessDirection::Write,
                access.value,
            ),
            EventKind::RegisterWrite(register) => (
                self.watch.register_label(&register.register).or_else(|| {
                    register
                        .alias
                        .as_deref()
                        .and_then(|alias| self.watch.register_label(alias))
                })?,
                AccessDirection::RegisterUpdate,
                register.value,
            ),
            EventKind::InstructionFetch(_) | EventKind::Opaque => return None,
        };

        Some(AccessAnnotation {
            label: label.to_string(),
            direction,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;

    fn watch() -> WatchList {
        WatchList::new()
            .with_address(0x2001ec00, "ADDRESS_Glb_LogCounter")
            .with_register("MSP", "MainStack")
    }

    fn event(line: &str) -> TraceEvent {
        parse_line(line, 1, None).unwrap()
    }

    #[test]
    fn test_watched_write() {
        let watch = watch();
        let watcher = AccessWatcher::new(&watch);
        let found = watcher
            .inspect(&event("100 ns MW4_D 2001ec00 00000072"))
            .unwrap();
        assert_eq!(found.to_string(), "ADDRESS_Glb_LogCounter <= 00000072");
    }

    #[test]
    fn test_watched_read() {
        let watch = watch();
        let watcher = AccessWatcher::new(&watch);
        let found = watcher
            .inspect(&event("100 ns MR4_D 2001ec00 00000071"))
            .unwrap();
        assert_eq!(found.direction, AccessDirection::Read);
        assert_eq!(found.to_string(), "ADDRESS_Glb_LogCounter => 00000071");
    }

    #[test]
    fn test_unwatched_address() {
        let watch = watch();
        let watcher = AccessWatcher::new(&watch);
        assert!(watcher.inspect(&event("100 ns MW4_D 2001ec04 00000072")).is_none());
    }

    #[test]
    fn test_register_matched_by_alias() {
        let watch = watch();
        let watcher = AccessWatcher::new(&watch);
        let found = watcher
            .inspect(&event("100 ns R r13 2001fe48 (MSP)"))
            .unwrap();
        assert_eq!(found.to_string(), "MainStack => 2001fe48");
    }

    #[test]
    fn test_fetch_is_never_watched() {
        let watch = watch();
        let watcher = AccessWatcher::new(&watch);
        assert!(watcher
            .inspect(&event("100 ns IT 2001ec00 b510 PUSH {r4,lr}"))
            .is_none());
    }
}
