//! Extraction of fenced code blocks from assistant prose.

/// One renderable unit of an assistant message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageSegment {
    Text(String),
    Fence {
        /// Language tag from the first line inside the fence, `text` when
        /// absent.
        language: String,
        code: String,
        /// SQL fences can be routed back into the dispatcher.
        executable: bool,
    },
}

/// Split assistant text into prose and triple-backtick fences. An
/// unterminated fence is kept as plain text.
pub fn extract_segments(text: &str) -> Vec<MessageSegment> {
    let mut segments = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("```") {
        let Some(close) = rest[open + 3..].find("```") else {
            break;
        };

        if open > 0 {
            segments.push(MessageSegment::Text(rest[..open].to_string()));
        }

        // The tag line is split off before any trimming, so a tagless
        // fence keeps its first content line out of the tag position.
        let inner = &rest[open + 3..open + 3 + close];
        let mut lines = inner.lines();
        let tag = lines.next().unwrap_or_default().trim();
        let language = if tag.is_empty() { "text" } else { tag }.to_string();
        let code = lines.collect::<Vec<_>>().join("\n").trim().to_string();
        let executable = language.eq_ignore_ascii_case("sql");

        segments.push(MessageSegment::Fence {
            language,
            code,
            executable,
        });

        rest = &rest[open + 3 + close + 3..];
    }

    if !rest.is_empty() {
        segments.push(MessageSegment::Text(rest.to_string()));
    }

    segments
}

/// The executable SQL blocks of a message, in order.
pub fn executable_blocks(text: &str) -> Vec<String> {
    extract_segments(text)
        .into_iter()
        .filter_map(|segment| match segment {
            MessageSegment::Fence {
                code,
                executable: true,
                ..
            } => Some(code),
            _ => None,
        })
        .collect()
}
