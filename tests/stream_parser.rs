use futures::{stream, StreamExt};
use pretty_assertions::assert_eq;
use quiz_generator::stream::{
    consume, to_canonical_json, Fragment, FramingPolicy, StreamParser,
};
use serde_json::Value;

const POLICIES: [FramingPolicy; 2] = [FramingPolicy::Incremental, FramingPolicy::LineDelimited];

const QUESTIONS: [&str; 3] = [
    r#"{"question_id": 1, "question": "What does {\"x\": 1} print?", "A": "a } b", "B": "[", "answer": "A"}"#,
    r#"{"question_id":2,"question":"Zürich \\ \"quoted\"","options":["x","y",{"nested":[1,2.5,-3e2]}],"ok":true,"none":null}"#,
    r#"{"question_id": 3, "wikipedia": "https://en.wikipedia.org/wiki/Crested_gecko"}"#,
];

fn joined(objects: &[&str]) -> String {
    let mut text = objects.join("\n");
    text.push('\n');
    text
}

fn expected(objects: &[&str]) -> Vec<String> {
    objects
        .iter()
        .map(|raw| to_canonical_json(&serde_json::from_str::<Value>(raw).unwrap()).unwrap())
        .collect()
}

fn run(policy: FramingPolicy, fragments: &[&str]) -> Vec<String> {
    StreamParser::with_policy(policy)
        .events(fragments.iter().copied())
        .map(|event| event.into_data())
        .collect()
}

fn char_boundaries(text: &str) -> Vec<usize> {
    text.char_indices().map(|(i, _)| i).skip(1).collect()
}

#[test]
fn test_any_two_way_split_yields_every_object_once_in_order() {
    let text = joined(&QUESTIONS);
    let want = expected(&QUESTIONS);

    for policy in POLICIES {
        for cut in char_boundaries(&text) {
            let got = run(policy, &[&text[..cut], &text[cut..]]);
            assert_eq!(got, want, "policy {policy}, cut at {cut}");
        }
    }
}

#[test]
fn test_any_three_way_split_yields_every_object_once_in_order() {
    let objects = [r#"{"q":"a\"}b","n":[1,{}]}"#, r#"{"q":"é","n":-0.5}"#];
    let text = joined(&objects);
    let want = expected(&objects);
    let cuts = char_boundaries(&text);

    for policy in POLICIES {
        for (i, &first) in cuts.iter().enumerate() {
            for &second in &cuts[i + 1..] {
                let got = run(
                    policy,
                    &[&text[..first], &text[first..second], &text[second..]],
                );
                assert_eq!(got, want, "policy {policy}, cuts at {first} and {second}");
            }
        }
    }
}

#[test]
fn test_one_character_per_fragment() {
    let text = joined(&QUESTIONS);
    let pieces: Vec<String> = text.chars().map(String::from).collect();
    let pieces: Vec<&str> = pieces.iter().map(String::as_str).collect();

    for policy in POLICIES {
        assert_eq!(run(policy, &pieces), expected(&QUESTIONS), "policy {policy}");
    }
}

#[test]
fn test_empty_fragments_anywhere_change_nothing() {
    let text = joined(&QUESTIONS);
    let pieces: Vec<&str> = text.split_inclusive(['"', ',', '\n']).collect();

    for policy in POLICIES {
        let baseline = run(policy, &pieces);
        assert_eq!(baseline, expected(&QUESTIONS));

        for position in 0..=pieces.len() {
            let mut fragments: Vec<Fragment> = pieces.iter().map(|p| Fragment::from(*p)).collect();
            fragments.insert(position, Fragment::empty());
            fragments.insert(position, Fragment::from(""));

            let got: Vec<String> = StreamParser::with_policy(policy)
                .events(fragments)
                .map(|event| event.into_data())
                .collect();
            assert_eq!(got, baseline, "policy {policy}, empties at {position}");
        }
    }
}

#[test]
fn test_nothing_is_emitted_before_the_object_completes() {
    let object = QUESTIONS[1];

    for policy in POLICIES {
        for cut in char_boundaries(object) {
            let mut parser = StreamParser::with_policy(policy);
            let events = parser.feed(&Fragment::from(&object[..cut]));
            assert!(events.is_empty(), "policy {policy}, prefix {:?}", &object[..cut]);
            assert_eq!(parser.emitted(), 0);
        }
    }
}

#[test]
fn test_completing_fragment_releases_the_object() {
    let object = QUESTIONS[0];
    let (head, tail) = object.split_at(object.len() - 1);

    let mut parser = StreamParser::with_policy(FramingPolicy::Incremental);
    assert!(parser.feed(&Fragment::from(head)).is_empty());
    let events = parser.feed(&Fragment::from(tail));
    assert_eq!(events.len(), 1);
}

#[test]
fn test_reserialized_data_is_structurally_equal() {
    let text = joined(&QUESTIONS);

    for policy in POLICIES {
        let events: Vec<_> = StreamParser::with_policy(policy)
            .events([text.as_str()])
            .collect();
        assert_eq!(events.len(), QUESTIONS.len());

        for (event, raw) in events.iter().zip(QUESTIONS) {
            let wire = event.to_wire();
            let data = wire
                .strip_prefix("data: ")
                .and_then(|rest| rest.strip_suffix("\n\n"))
                .unwrap();
            assert!(!data.contains('\n'));

            let emitted: Value = serde_json::from_str(data).unwrap();
            let original: Value = serde_json::from_str(raw).unwrap();
            assert_eq!(emitted, original);
        }
    }
}

#[test]
fn test_end_to_end_scenario() {
    for policy in POLICIES {
        let wire: Vec<String> = StreamParser::with_policy(policy)
            .events(["{\"a\":1}", "\n{\"b\"", ":2}\n"])
            .map(|event| event.to_wire())
            .collect();
        assert_eq!(wire, vec!["data: {\"a\": 1}\n\n", "data: {\"b\": 2}\n\n"]);
    }
}

#[test]
fn test_malformed_trailing_content() {
    for policy in POLICIES {
        let wire: Vec<String> = StreamParser::with_policy(policy)
            .events(["{\"a\":1}\n", "not-json"])
            .map(|event| event.to_wire())
            .collect();
        assert_eq!(wire, vec!["data: {\"a\": 1}\n\n"]);
    }
}

#[test]
fn test_integers_beyond_64_bits_survive() {
    for policy in POLICIES {
        let data: Vec<String> = StreamParser::with_policy(policy)
            .events([r#"{"n": 1234567890123"#, r#"45678901234}"#, "\n"])
            .map(|event| event.into_data())
            .collect();
        assert_eq!(data, vec![r#"{"n": 123456789012345678901234}"#]);
    }
}

#[test]
fn test_default_consume_splits_on_newlines() {
    let wire: Vec<String> = consume(["Here is your quiz:\n{\"a\":1}", "\n{\"b\":", "2}"])
        .map(|event| event.to_wire())
        .collect();
    assert_eq!(wire, vec!["data: {\"a\": 1}\n\n", "data: {\"b\": 2}\n\n"]);
}

#[test]
fn test_incremental_framing_needs_no_delimiter() {
    let wire: Vec<String> = StreamParser::with_policy(FramingPolicy::Incremental)
        .events(["{\"a\":1}{\"b\":", "2}"])
        .map(|event| event.to_wire())
        .collect();
    assert_eq!(wire, vec!["data: {\"a\": 1}\n\n", "data: {\"b\": 2}\n\n"]);
}

#[test]
fn test_async_stream_matches_iterator() {
    let text = joined(&QUESTIONS);

    for policy in POLICIES {
        for cut in char_boundaries(&text).into_iter().step_by(17) {
            let fragments = vec![
                Ok::<_, String>(text[..cut].to_string()),
                Ok(String::new()),
                Ok(text[cut..].to_string()),
            ];
            let got: Vec<String> = tokio_test::block_on(
                StreamParser::with_policy(policy)
                    .into_stream(stream::iter(fragments))
                    .map(|event| event.unwrap().into_data())
                    .collect(),
            );
            assert_eq!(got, expected(&QUESTIONS), "policy {policy}, cut at {cut}");
        }
    }
}
