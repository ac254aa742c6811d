use crate::{Diagnostic, Location, Message, Position, Source};
use pretty_assertions::assert_eq;

#[test]
fn report_located_message_1() {
    assert_eq!(
        Diagnostic::report_located_message(
            5,
            3,
            "test/file",
            "abcdefg",
            &Message {
                content: String::from("some error"),
                addendum: None
            },
        ),
        [
            "test/file:5:3: error: some error",
            "  |",
            "5 | abcdefg",
            "  |   ^",
        ]
        .join("\n")
    )
}

#[test]
fn report_located_message_2() {
    assert_eq!(
        Diagnostic::report_located_message(
            10,
            2,
            "test/file",
            "abcdefg",
            &Message {
                content: String::from("some error"),
                addendum: Some(String::from("some detail"))
            }
        ),
        [
            "test/file:10:2: error: some error",
            "   |",
            "10 | abcdefg",
            "   |  ^",
            "some detail",
        ]
        .join("\n")
    )
}

#[test]
fn position_from_offset() {
    let text = "first\nsecond line\nthird";
    let (position, line) = Position::from_offset(text, 13);
    assert_eq!((position.line, position.column, line), (2, 8, "second line"));

    let (position, line) = Position::from_offset(text, 100);
    assert_eq!((position.line, position.column, line), (3, 6, "third"));
}

#[test]
fn render_with_orders_by_offset() {
    let source = Source::Interactive {
        label: String::from("test"),
    };
    let mut diagnostic = Diagnostic::new();
    diagnostic.item(
        Some(Location {
            source: source.clone(),
            offset: Some(4),
        }),
        Message {
            content: String::from("second"),
            addendum: None,
        },
    );
    diagnostic.item(
        Some(Location {
            source: source.clone(),
            offset: Some(0),
        }),
        Message {
            content: String::from("first"),
            addendum: None,
        },
    );
    diagnostic.item(
        None,
        Message {
            content: String::from("unlocated"),
            addendum: None,
        },
    );
    assert_eq!(diagnostic.len(), 3);

    let rendered = diagnostic.render_with(|_| Some(String::from("f x = x")));
    assert_eq!(
        rendered,
        vec![
            String::from("error: unlocated"),
            ["test:1:1: error: first", "  |", "1 | f x = x", "  | ^"].join("\n"),
            ["test:1:5: error: second", "  |", "1 | f x = x", "  |     ^"].join("\n"),
        ]
    )
}
