//! Identifier helpers for generated code

use regex::Regex;
use std::sync::LazyLock;

static UPPER_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("valid regex"));
static LOWER_UPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"));

/// `CamelCase` -> `camel_case`. Existing underscores are kept.
pub fn to_snake_case(name: &str) -> String {
    let s = UPPER_WORD.replace_all(name, "${1}_${2}");
    let s = LOWER_UPPER.replace_all(&s, "${1}_${2}");
    s.to_lowercase()
}

/// Snake-case identifier for a vendored library name.
///
/// `ImGui` is folded to `Imgui` first so that it yields `imgui` and not `im_gui`.
pub fn library_snake_case(name: &str) -> String {
    let name = name.replace("ImGui", "Imgui").replace('-', "_");
    to_snake_case(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_words() {
        assert_eq!(to_snake_case("ImCoolBar"), "im_cool_bar");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn imgui_prefix_is_one_word() {
        assert_eq!(
            library_snake_case("ImGuiColorTextEdit"),
            "imgui_color_text_edit"
        );
        assert_eq!(library_snake_case("ImGuizmo"), "imguizmo");
    }

    #[test]
    fn hyphens_become_underscores() {
        assert_eq!(library_snake_case("imgui-node-editor"), "imgui_node_editor");
        assert_eq!(library_snake_case("imgui-knobs"), "imgui_knobs");
    }
}
