//! Unit tests for the prompt composer

use portrait_gateway::workflow::prompt::{compose, DEFAULT_DESCRIPTION};

#[test]
fn test_compose_is_deterministic() {
    let description = "an old fisherman with a white beard";
    assert_eq!(compose(description), compose(description));
}

#[test]
fn test_empty_description_uses_default() {
    let prompt = compose("");
    assert!(prompt.contains(DEFAULT_DESCRIPTION));
    assert_eq!(prompt, compose(DEFAULT_DESCRIPTION));
}

#[test]
fn test_template_is_identical_around_the_slot() {
    let a = compose("A");
    let b = compose("a much longer description of someone");

    let (a_head, a_tail) = a.split_once("A").unwrap();
    let (b_head, b_tail) = b.split_once("a much longer description of someone").unwrap();

    assert_eq!(a_head, b_head);
    assert_eq!(a_tail, b_tail);
}

#[test]
fn test_template_mentions_style_elements() {
    let prompt = compose("");
    for needle in ["anime", "colors", "linework", "backgrounds"] {
        assert!(prompt.contains(needle), "missing {needle}");
    }
}
