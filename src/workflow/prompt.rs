//! Expands a user's short description into a full generation instruction

/// Substituted when the user leaves the description blank
pub const DEFAULT_DESCRIPTION: &str = "a character with expressive features and detailed background";

const TEMPLATE_HEAD: &str =
    "Transform this portrait into a hand-painted anime character with these characteristics: ";

const TEMPLATE_TAIL: &str = ". \
Use soft, vibrant watercolor-like colors, delicate linework, and large expressive eyes. \
Include detailed backgrounds with natural elements like foliage, clouds, or water. \
Maintain the essence and emotion of the original portrait while giving it a whimsical, nostalgic feel.";

/// Wrap `description` (or the default) in the fixed style template.
pub fn compose(description: &str) -> String {
    let description = match description.trim() {
        "" => DEFAULT_DESCRIPTION,
        trimmed => trimmed,
    };

    let mut prompt =
        String::with_capacity(TEMPLATE_HEAD.len() + description.len() + TEMPLATE_TAIL.len());
    prompt.push_str(TEMPLATE_HEAD);
    prompt.push_str(description);
    prompt.push_str(TEMPLATE_TAIL);
    prompt
}
