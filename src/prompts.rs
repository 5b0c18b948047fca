pub const QUIZ_USER: &str = include_str!("../data/prompts/quiz_user.txt");
pub const EXAMPLE_QUESTION: &str = include_str!("../data/prompts/example_question.json");

/// Replace `{{key}}` placeholders in a template string.
///
/// Substituted values are never rescanned, so a value that itself contains
/// `{{...}}` is inserted literally. Unknown placeholders are left as-is.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];

        let Some(end) = after_open.find("}}") else {
            result.push_str(&rest[start..]);
            return result;
        };

        let key = &after_open[..end];
        match vars.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => result.push_str(value),
            None => result.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after_open[end + 2..];
    }

    result.push_str(rest);
    result
}

/// Build the instruction sent to the completion service for one quiz.
///
/// Inputs are assumed to be validated by the caller.
pub fn quiz_prompt(topic: &str, difficulty: &str, n_questions: u32) -> String {
    let n_questions = n_questions.to_string();
    render(
        QUIZ_USER.trim(),
        &[
            ("n_questions", &n_questions),
            ("example", EXAMPLE_QUESTION.trim()),
            ("topic", topic),
            ("difficulty", difficulty),
        ],
    )
}
