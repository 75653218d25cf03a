// Extraction prompt templates. Placeholders: {section}, {title}, {shape}, {raw_text}.

pub const SECTION_EXTRACT_SYSTEM: &str = "\
You are a precise resume data extractor. \
Convert the text of one resume section into JSON. \
You MUST respond with valid JSON only, with no markdown fences and no explanations. \
Copy wording from the input; do not invent schools, employers, dates or achievements. \
Leave a field as an empty string when the text does not mention it.";

pub const SECTION_EXTRACT_PROMPT: &str = r#"Extract the "{title}" section ({section}) of a resume from the text below.

INPUT TEXT:
{raw_text}

OUTPUT SHAPE (return exactly this structure, repeating array items as needed):
{shape}

Put each bullet point of a list field in its own array element."#;
