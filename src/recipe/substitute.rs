// src/recipe/substitute.rs

//! Variable substitution for recipe templates
//!
//! Three placeholders are recognized:
//! - `$(MKVFX_ROOT)`: install root
//! - `$(MKVFX_SRC_ROOT)`: source root
//! - `$(MKVFX_BUILD_ROOT)`: build root
//!
//! Substitution repeats until the string stops changing, so a root that
//! expands to another placeholder is resolved in the same call.
//!
//! There is no escape syntax. A literal `$(MKVFX_ROOT)` in a command is
//! always replaced; recipes cannot pass the token through to the shell.

use super::context::BuildContext;
use tracing::warn;

pub const INSTALL_ROOT_VAR: &str = "$(MKVFX_ROOT)";
pub const SOURCE_ROOT_VAR: &str = "$(MKVFX_SRC_ROOT)";
pub const BUILD_ROOT_VAR: &str = "$(MKVFX_BUILD_ROOT)";

/// Upper bound on substitution passes
///
/// Only reachable when a root path itself contains its own placeholder.
const MAX_PASSES: usize = 16;

/// Expand all placeholders in `template`
pub fn expand(template: &str, ctx: &BuildContext) -> String {
    let install_root = ctx.install_root.to_string_lossy();
    let source_root = ctx.source_root.to_string_lossy();
    let build_root = ctx.build_root.to_string_lossy();

    let mut current = template.to_string();
    for _ in 0..MAX_PASSES {
        let next = current
            .replace(INSTALL_ROOT_VAR, &install_root)
            .replace(SOURCE_ROOT_VAR, &source_root)
            .replace(BUILD_ROOT_VAR, &build_root);

        if next == current {
            return next;
        }
        current = next;
    }

    warn!("Variable substitution did not settle for: {}", template);
    current
}

/// Check whether a string still contains a placeholder
pub fn has_placeholder(text: &str) -> bool {
    [INSTALL_ROOT_VAR, SOURCE_ROOT_VAR, BUILD_ROOT_VAR]
        .iter()
        .any(|var| text.contains(var))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::context::Platform;

    fn ctx() -> BuildContext {
        BuildContext::new("/work/local", "/home/u/mkvfx-sources", "/home/u/mkvfx-build", Platform::Osx)
    }

    #[test]
    fn test_expand_all_roots() {
        let out = expand(
            "cmake -DCMAKE_INSTALL_PREFIX=$(MKVFX_ROOT) -S $(MKVFX_SRC_ROOT)/zlib -B $(MKVFX_BUILD_ROOT)/zlib",
            &ctx(),
        );
        assert_eq!(
            out,
            "cmake -DCMAKE_INSTALL_PREFIX=/work/local -S /home/u/mkvfx-sources/zlib -B /home/u/mkvfx-build/zlib"
        );
    }

    #[test]
    fn test_expand_repeated_occurrences() {
        let out = expand("$(MKVFX_ROOT)/lib:$(MKVFX_ROOT)/bin", &ctx());
        assert_eq!(out, "/work/local/lib:/work/local/bin");
    }

    #[test]
    fn test_expand_without_placeholders_is_identity() {
        assert_eq!(expand("make -j8", &ctx()), "make -j8");
        assert_eq!(expand("", &ctx()), "");
    }

    #[test]
    fn test_nested_placeholders_resolve_in_one_call() {
        // The install root itself refers to the source root
        let ctx = BuildContext::new(
            "$(MKVFX_SRC_ROOT)/prefix",
            "/src",
            "$(MKVFX_ROOT)/build",
            Platform::Linux,
        );

        let out = expand("$(MKVFX_BUILD_ROOT) $(MKVFX_ROOT)", &ctx);
        assert_eq!(out, "/src/prefix/build /src/prefix");
        assert!(!has_placeholder(&out));
    }

    #[test]
    fn test_self_referential_root_terminates() {
        let ctx = BuildContext::new("x$(MKVFX_ROOT)", "/s", "/b", Platform::Linux);
        let out = expand("$(MKVFX_ROOT)", &ctx);
        assert!(out.starts_with("xxx"));
    }

    #[test]
    fn test_has_placeholder() {
        assert!(has_placeholder("a $(MKVFX_BUILD_ROOT) b"));
        assert!(!has_placeholder("$(OTHER)"));
    }
}
