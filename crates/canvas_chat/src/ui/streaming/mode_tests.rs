use super::test_utils::{chunk_str, feed_content, joined, texts, TestSink};
use super::{Emission, Mode, ModeStateMachine, RenderRouter, RenderTarget};

use RenderTarget::{CodeCanvasLine, ReasoningText, TranscriptText};

fn text(target: RenderTarget, s: &str) -> (RenderTarget, String) {
    (target, s.to_string())
}

#[test]
fn test_plain_text_is_lossless_regardless_of_chunking() {
    let input = "Plain answer with a < b comparison, an <em>tag</em> and ünïcödé.";

    let whole = feed_content(&[input]);
    let chars = chunk_str(input, 1);
    let tokens: Vec<&str> = chars.iter().map(String::as_str).collect();
    let bytewise = feed_content(&tokens);

    assert_eq!(joined(&whole, TranscriptText), input);
    assert_eq!(joined(&bytewise, TranscriptText), input);
}

#[test]
fn test_marker_spanning_tokens() {
    let emissions = feed_content(&["<", "think", ">", "hi", "</think>", "bye"]);

    assert_eq!(
        texts(&emissions),
        vec![
            text(TranscriptText, ""),
            text(ReasoningText, "hi"),
            text(TranscriptText, "bye"),
        ]
    );
    assert_eq!(
        emissions
            .iter()
            .filter(|e| !matches!(e, Emission::Text { .. }))
            .cloned()
            .collect::<Vec<_>>(),
        vec![
            Emission::RegionOpened(Mode::Reasoning),
            Emission::RegionClosed(Mode::Reasoning),
        ]
    );
}

#[test]
fn test_marker_split_across_tokens() {
    let mut machine = ModeStateMachine::new();
    machine.push_content("<thi");
    assert_eq!(machine.mode(), Mode::Normal);
    assert_eq!(machine.pending(), "<thi");

    machine.push_content("nk>hello</think>");
    assert_eq!(machine.mode(), Mode::Normal);

    let emissions: Vec<Emission> = machine.queue_mut().drain(..).collect();
    assert_eq!(joined(&emissions, ReasoningText), "hello");
    assert_eq!(joined(&emissions, TranscriptText), "");
}

#[test]
fn test_text_around_markers_in_one_token() {
    let emissions = feed_content(&["Before <think>inner</think> after"]);
    assert_eq!(
        texts(&emissions),
        vec![
            text(TranscriptText, "Before "),
            text(ReasoningText, "inner"),
            text(TranscriptText, " after"),
        ]
    );
}

#[test]
fn test_whitespace_inside_markers() {
    let emissions = feed_content(&["a< think\n>", "deep", "</ think >", "b"]);
    assert_eq!(joined(&emissions, TranscriptText), "ab");
    assert_eq!(joined(&emissions, ReasoningText), "deep");
}

#[test]
fn test_non_marker_angle_brackets_are_released() {
    let mut machine = ModeStateMachine::new();
    machine.push_content("x <th");
    assert_eq!(machine.pending(), "<th");

    machine.push_content("e end");
    assert_eq!(machine.pending(), "");
    let emissions: Vec<Emission> = machine.queue_mut().drain(..).collect();
    assert_eq!(joined(&emissions, TranscriptText), "x <the end");
}

#[test]
fn test_reasoning_does_not_watch_opening_markers() {
    let emissions = feed_content(&["<think>see <codecanvas> here</think>"]);
    assert_eq!(joined(&emissions, ReasoningText), "see <codecanvas> here");
    assert_eq!(joined(&emissions, CodeCanvasLine), "");
}

#[test]
fn test_structured_reasoning_opens_and_closes_implicitly() {
    let mut machine = ModeStateMachine::new();
    machine.push_reasoning("x");
    assert_eq!(machine.mode(), Mode::Reasoning);
    machine.push_reasoning("y");

    // An empty content delta does not close the region
    machine.push_content("");
    assert_eq!(machine.mode(), Mode::Reasoning);

    machine.push_content("answer");
    assert_eq!(machine.mode(), Mode::Normal);

    let emissions: Vec<Emission> = machine.queue_mut().drain(..).collect();
    assert_eq!(
        texts(&emissions),
        vec![
            text(TranscriptText, ""),
            text(ReasoningText, "x"),
            text(ReasoningText, "y"),
            text(TranscriptText, "answer"),
        ]
    );
    assert!(emissions.contains(&Emission::RegionClosed(Mode::Reasoning)));
}

#[test]
fn test_literal_reasoning_is_not_closed_by_content() {
    let mut machine = ModeStateMachine::new();
    machine.push_content("<think>");
    machine.push_content("still thinking");
    assert_eq!(machine.mode(), Mode::Reasoning);
}

#[test]
fn test_structured_reasoning_inside_canvas_keeps_canvas_open() {
    let mut machine = ModeStateMachine::new();
    machine.push_content("<codecanvas>a=1\n");
    machine.push_reasoning("hmm");
    assert_eq!(machine.mode(), Mode::CodeCanvas);
    machine.push_content("b=2\n</codecanvas>");

    let emissions: Vec<Emission> = machine.queue_mut().drain(..).collect();
    assert_eq!(joined(&emissions, ReasoningText), "hmm");
    assert_eq!(joined(&emissions, CodeCanvasLine), "a=1\nb=2\n");
}

#[test]
fn test_code_canvas_line_replacement() {
    let mut machine = ModeStateMachine::new();
    let mut router = RenderRouter::new();
    let mut sink = TestSink::new();

    machine.push_content("<codecanvas>");
    router.drain(machine.queue_mut(), &mut sink).unwrap();
    assert_eq!(router.cursor(), 1);

    let mut code_emissions = Vec::new();
    for token in ["a=1\n", "b=2\n"] {
        machine.push_content(token);
        let applied = router.drain(machine.queue_mut(), &mut sink).unwrap();
        code_emissions.extend(
            texts(&applied)
                .into_iter()
                .filter(|(target, _)| *target == CodeCanvasLine),
        );
    }

    assert_eq!(code_emissions.len(), 2);
    assert_eq!(router.cursor(), 3);
    assert_eq!(
        sink.canvas_lines(),
        vec![(1, "a=1".to_string()), (2, "b=2".to_string())]
    );
}

#[test]
fn test_code_lines_split_across_tokens() {
    let mut machine = ModeStateMachine::new();
    let mut router = RenderRouter::new();
    let mut sink = TestSink::new();

    for token in ["<codecanvas>\nfn ma", "in() {\r\n    x", "\n}", "\n</code", "canvas>done"] {
        machine.push_content(token);
        router.drain(machine.queue_mut(), &mut sink).unwrap();
    }

    assert_eq!(
        sink.canvas_lines(),
        vec![
            (1, String::new()),
            (2, "fn main() {".to_string()),
            (3, "    x".to_string()),
            (4, "}".to_string()),
        ]
    );
    assert_eq!(sink.transcript(), "done");
    assert_eq!(machine.mode(), Mode::Normal);
}

#[test]
fn test_cursor_resets_for_each_canvas() {
    let mut machine = ModeStateMachine::new();
    let mut router = RenderRouter::new();
    let mut sink = TestSink::new();

    machine.push_content("<codecanvas>one\ntwo\n</codecanvas>text<codecanvas>three\n</codecanvas>");
    router.drain(machine.queue_mut(), &mut sink).unwrap();

    assert_eq!(
        sink.canvas_lines(),
        vec![
            (1, "one".to_string()),
            (2, "two".to_string()),
            (1, "three".to_string()),
        ]
    );
    assert_eq!(sink.transcript(), "text");
}

#[test]
fn test_partial_code_line_is_flushed_on_close() {
    let mut machine = ModeStateMachine::new();
    let mut router = RenderRouter::new();
    let mut sink = TestSink::new();

    machine.push_content("<codecanvas>let x = 1;</codecanvas>");
    router.drain(machine.queue_mut(), &mut sink).unwrap();

    assert_eq!(sink.canvas_lines(), vec![(1, "let x = 1;".to_string())]);
    assert_eq!(router.cursor(), 2);
}

#[test]
fn test_closing_marker_remnant_is_not_written() {
    let mut router = RenderRouter::new();
    let mut sink = TestSink::new();
    let mut queue = std::collections::VecDeque::from(vec![
        Emission::RegionOpened(Mode::CodeCanvas),
        Emission::code_line("a=1\n"),
        Emission::code_line("</ codecanvas >\n"),
        Emission::code_line("b=2\n"),
    ]);

    router.drain(&mut queue, &mut sink).unwrap();

    assert_eq!(
        sink.canvas_lines(),
        vec![(1, "a=1".to_string()), (2, "b=2".to_string())]
    );
    assert_eq!(router.cursor(), 3);
}

#[test]
fn test_unterminated_region_is_flushed_to_its_target() {
    let mut machine = ModeStateMachine::new();
    machine.push_content("<think>never closed </thi");

    assert_eq!(machine.finish(), Some(Mode::Reasoning));
    let emissions: Vec<Emission> = machine.queue_mut().drain(..).collect();
    assert_eq!(joined(&emissions, ReasoningText), "never closed </thi");
    assert!(!emissions.contains(&Emission::RegionClosed(Mode::Reasoning)));
}

#[test]
fn test_finish_in_normal_releases_held_prefix() {
    let mut machine = ModeStateMachine::new();
    machine.push_content("tail <code");

    assert_eq!(machine.finish(), None);
    let emissions: Vec<Emission> = machine.queue_mut().drain(..).collect();
    assert_eq!(joined(&emissions, TranscriptText), "tail <code");
}

#[test]
fn test_emissions_reconstruct_input_without_markers() {
    let input = "Intro <think>plan</think> then <codecanvas>x = 1\ny = 2\n</codecanvas> outro";
    let expected = "Intro plan then x = 1\ny = 2\n outro";

    for size in [1, 2, 3, 5, 8, 13, 100] {
        let chunks = chunk_str(input, size);
        let tokens: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let emissions = feed_content(&tokens);

        let all: String = texts(&emissions).into_iter().map(|(_, t)| t).collect();
        assert_eq!(all, expected, "chunk size {size}");
        assert_eq!(joined(&emissions, ReasoningText), "plan", "chunk size {size}");
        assert_eq!(
            joined(&emissions, CodeCanvasLine),
            "x = 1\ny = 2\n",
            "chunk size {size}"
        );
    }
}

#[test]
fn test_each_opening_marker_selects_its_region() {
    for (input, region, target) in [
        ("a<think>b", Mode::Reasoning, ReasoningText),
        ("a<codecanvas>b", Mode::CodeCanvas, CodeCanvasLine),
    ] {
        let mut machine = ModeStateMachine::new();
        machine.push_content(input);
        assert_eq!(machine.mode(), region);

        let emissions: Vec<Emission> = machine.queue_mut().drain(..).collect();
        assert_eq!(
            emissions,
            vec![
                Emission::Text {
                    target: TranscriptText,
                    text: "a".to_string()
                },
                Emission::RegionOpened(region),
                Emission::Text {
                    target,
                    text: "b".to_string()
                },
            ]
        );
    }
}
