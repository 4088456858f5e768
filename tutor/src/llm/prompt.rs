//! Prompt templates.

use super::client::GenerateRequest;
use crate::models::Message;

/// Characters of the story used to prompt its illustration.
const ILLUSTRATION_EXCERPT: usize = 200;

/// Render the newest user turn, with attached file text ahead of the question.
pub fn chat_turn(content: &str, file_content: Option<&str>) -> String {
    match file_content {
        Some(file) if !file.trim().is_empty() => format!(
            "The user has provided the following file content for context. \
             Use this file to answer the user's prompt.\n\n\
             File Content:\n```\n{file}\n```\n\n{content}"
        ),
        _ => content.to_string(),
    }
}

/// Build a conversational request: prior history plus the new user turn.
pub fn chat_request(
    model: &str,
    system_prompt: &str,
    history: &[Message],
    content: &str,
    file_content: Option<&str>,
) -> GenerateRequest {
    let mut contents = history.to_vec();
    contents.push(Message::user(chat_turn(content, file_content)));

    GenerateRequest {
        contents,
        ..GenerateRequest::prompt(model, "")
    }
    .with_system_instruction(system_prompt)
}

/// Prompt for a single-paragraph story.
pub fn story(topic: &str) -> String {
    format!(
        "Write a short, imaginative story based on the following prompt. \
         The story should be a single paragraph.\n\nPrompt: \"{topic}\""
    )
}

/// Prompt for a storybook illustration of the opening of `story`.
pub fn illustration(story: &str) -> String {
    let excerpt: String = story.chars().take(ILLUSTRATION_EXCERPT).collect();
    format!(
        "Create a whimsical, storybook-style illustration for the following scene: {excerpt}..."
    )
}

/// Prompt asking for a markdown analysis of CSV data plus a bar chart spec.
pub fn analysis(csv: &str, question: &str) -> String {
    format!(
        r#"You are a professional data analyst. Your task is to analyze the provided CSV data based on the user's prompt. Provide a clear, concise analysis in Markdown format. Also, provide the data and configuration needed to generate a bar chart that visualizes your findings.

User Prompt:
"{question}"

CSV Data:
```csv
{csv}
```

Instructions:
1. Analysis: Write a summary of your findings in the "analysis" field. Address the user's prompt directly.
2. Chart Data: Prepare the data for a bar chart in the "chart.data" field. This should be an array of JSON objects.
3. Chart Configuration:
   * "chart.x_axis_key": the key from your data objects used for the X-axis (e.g. "city", "product", "month").
   * "chart.y_axis_keys": an array of keys from your data objects plotted on the Y-axis (e.g. ["sales", "users"]).
   * "chart.config": for each key in "y_axis_keys", a "label" (e.g. "Total Sales") and a "color" such as "hsl(var(--chart-1))", using the chart variables --chart-1, --chart-2, and so on.

Respond with a single JSON object shaped like:
{{
  "analysis": "The analysis shows that...",
  "chart": {{
    "config": {{
      "sales": {{ "label": "Total Sales", "color": "hsl(var(--chart-1))" }},
      "units": {{ "label": "Units Sold", "color": "hsl(var(--chart-2))" }}
    }},
    "data": [
      {{ "month": "Jan", "sales": 4000, "units": 240 }},
      {{ "month": "Feb", "sales": 3000, "units": 139 }}
    ],
    "x_axis_key": "month",
    "y_axis_keys": ["sales", "units"]
  }}
}}
"#
    )
}
