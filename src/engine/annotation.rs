//! Generated text attached to trace events.
//!
//! Two shapes exist: banners, written as a block before the line that caused
//! them, and inline comments, appended to the line itself.

use super::call_stack::CallTransition;
use crate::parser::HexWord;
use crate::utils::config::{
    AnnotatorConfig, BANNER_ENTRY_RULE, BANNER_EXIT_RULE, BANNER_RESUME_RULE, CHAIN_INDENT,
};
use std::fmt;

/// What a banner announces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Entry,
    Exit,
    Resume,
    Adopt,
}

/// Multi-line block written before an event's line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub lines: Vec<String>,
}

impl Banner {
    /// Render a call-stack transition
    ///
    /// **Public** - used by the annotator for every transition
    ///
    /// Entry banners:
    /// ```text
    /// @@@@...@@@@
    /// LOG_ILogWaypointValue entry (2000afc0)
    /// src/log/Log_Handlers.c
    /// void LOG_ILogWaypointValue( uint32 logVal )
    ///     Project_AppMain -> Project_AppExecute -> LOG_ILogWaypointValue
    /// ```
    pub fn from_transition(transition: &CallTransition<'_>, config: &AnnotatorConfig) -> Self {
        match transition {
            CallTransition::Enter {
                symbol,
                caller_chain,
                ..
            } => {
                let mut lines = vec![
                    BANNER_ENTRY_RULE.to_string(),
                    format!("{} entry ({:08x})", symbol.name, symbol.entry),
                ];
                if let Some(file) = &symbol.source_file {
                    lines.push(file.display().to_string());
                }
                if let Some(prototype) = &symbol.prototype {
                    lines.push(prototype.clone());
                }
                if caller_chain.len() > 1 {
                    lines.push(format!(
                        "{}{}",
                        CHAIN_INDENT,
                        render_chain(caller_chain, config.chain_limit)
                    ));
                }
                Self {
                    kind: BannerKind::Entry,
                    lines,
                }
            }
            CallTransition::Exit { symbol, .. } => Self {
                kind: BannerKind::Exit,
                lines: vec![
                    format!("{} exiting...", symbol.name),
                    BANNER_EXIT_RULE.to_string(),
                ],
            },
            CallTransition::Resume { symbol, .. } => Self {
                kind: BannerKind::Resume,
                lines: vec![
                    format!("{} resuming...", symbol.name),
                    BANNER_RESUME_RULE.to_string(),
                ],
            },
            CallTransition::Adopt {
                symbol, address, ..
            } => Self {
                kind: BannerKind::Adopt,
                lines: vec![
                    format!(
                        "{} executing (caller unknown, capture started at {:08x})",
                        symbol.name, address
                    ),
                    BANNER_RESUME_RULE.to_string(),
                ],
            },
        }
    }
}

/// `A -> B -> C`, keeping only the innermost `limit - 1` names behind `...`
/// once the chain is longer than `limit`
pub fn render_chain(chain: &[&str], limit: usize) -> String {
    if chain.len() <= limit {
        return chain.join(" -> ");
    }
    let keep = limit.saturating_sub(1).max(1);
    format!("... -> {}", chain[chain.len() - keep..].join(" -> "))
}

/// Arrow shown between label and value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDirection {
    Read,
    Write,
    RegisterUpdate,
}

impl AccessDirection {
    pub fn arrow(&self) -> &'static str {
        match self {
            AccessDirection::Write => "<=",
            AccessDirection::Read | AccessDirection::RegisterUpdate => "=>",
        }
    }
}

/// `LABEL <= value` for a watched address or register
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessAnnotation {
    pub label: String,
    pub direction: AccessDirection,
    pub value: HexWord,
}

impl fmt::Display for AccessAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.label, self.direction.arrow(), self.value)
    }
}

/// Text appended to the end of a line after `; `
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineComment {
    Access(AccessAnnotation),
    /// Listing disassembly for fetch lines that carry none
    Disassembly(String),
}

impl fmt::Display for InlineComment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InlineComment::Access(access) => write!(f, "{}", access),
            InlineComment::Disassembly(text) => f.write_str(text),
        }
    }
}

/// Unit of generated text keyed to one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    Banner(Banner),
    Inline(InlineComment),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{AddressRange, Symbol};
    use pretty_assertions::assert_eq;

    fn config() -> AnnotatorConfig {
        AnnotatorConfig::default()
    }

    #[test]
    fn test_entry_banner_with_source_and_chain() {
        let symbol = Symbol::new(
            "LOG_ILogWaypointValue",
            0x2000afc0,
            AddressRange::new(0x2000afc0, 0x2000afe0),
        )
        .with_source(
            "src/log/Log_Handlers.c",
            "void LOG_ILogWaypointValue( uint32 logVal )",
        );
        let transition = CallTransition::Enter {
            symbol: &symbol,
            caller_chain: vec!["Project_AppMain", "LOG_ILogWaypointValue"],
            depth: 2,
            timestamp: Some(100),
        };

        let banner = Banner::from_transition(&transition, &config());
        assert_eq!(banner.kind, BannerKind::Entry);
        assert_eq!(
            banner.lines,
            vec![
                "@".repeat(120),
                "LOG_ILogWaypointValue entry (2000afc0)".to_string(),
                "src/log/Log_Handlers.c".to_string(),
                "void LOG_ILogWaypointValue( uint32 logVal )".to_string(),
                "    Project_AppMain -> LOG_ILogWaypointValue".to_string(),
            ]
        );
    }

    #[test]
    fn test_entry_banner_at_depth_one_has_no_chain() {
        let symbol = Symbol::new("main", 0x100, AddressRange::new(0x100, 0x140));
        let transition = CallTransition::Enter {
            symbol: &symbol,
            caller_chain: vec!["main"],
            depth: 1,
            timestamp: None,
        };
        let banner = Banner::from_transition(&transition, &config());
        assert_eq!(banner.lines.len(), 2);
        assert_eq!(banner.lines[1], "main entry (00000100)");
    }

    #[test]
    fn test_exit_and_resume_banners() {
        let symbol = Symbol::new("worker", 0x100, AddressRange::new(0x100, 0x140));

        let exit = Banner::from_transition(&CallTransition::Exit { symbol: &symbol, depth: 2 }, &config());
        assert_eq!(exit.lines, vec!["worker exiting...".to_string(), ">".repeat(80)]);

        let resume =
            Banner::from_transition(&CallTransition::Resume { symbol: &symbol, depth: 1 }, &config());
        assert_eq!(resume.lines, vec!["worker resuming...".to_string(), "<".repeat(80)]);
    }

    #[test]
    fn test_chain_abbreviation() {
        let chain = ["a", "b", "c", "d", "e"];
        assert_eq!(render_chain(&chain, 8), "a -> b -> c -> d -> e");
        assert_eq!(render_chain(&chain, 5), "a -> b -> c -> d -> e");
        assert_eq!(render_chain(&chain, 3), "... -> d -> e");
    }

    #[test]
    fn test_access_annotation_text() {
        let write = AccessAnnotation {
            label: "ADDRESS_Glb_LogCounter".to_string(),
            direction: AccessDirection::Write,
            value: HexWord::new(0x72, 8),
        };
        assert_eq!(write.to_string(), "ADDRESS_Glb_LogCounter <= 00000072");

        let read = AccessAnnotation {
            direction: AccessDirection::Read,
            ..write
        };
        assert_eq!(
            InlineComment::Access(read).to_string(),
            "ADDRESS_Glb_LogCounter => 00000072"
        );
    }
}
