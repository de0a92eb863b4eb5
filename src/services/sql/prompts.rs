//! System context assembly for completion and conversation requests.
//!
//! These functions are pure and perform no I/O; callers rebuild the
//! context on every request so schema and editor drift is always
//! reflected.

/// System context for a single inline-completion request.
pub fn completion_context(schema: &str) -> String {
    let schema = if schema.is_empty() {
        "No schema available"
    } else {
        schema
    };

    format!(
        "You are an AI-powered SQL autocomplete engine that provides intelligent inline suggestions.\n\
         \n\
         Database Schema:\n\
         {schema}\n\
         \n\
         Your job is to predict what the user wants to type next and provide a SINGLE inline completion.\n\
         \n\
         Rules:\n\
         1. Return ONLY the completion text that should appear after the user's current input\n\
         2. Provide smart, context-aware completions based on SQL patterns and the database schema\n\
         3. For incomplete queries, suggest the most likely complete SQL statement\n\
         4. Keep suggestions practical and executable\n\
         5. Don't include the user's existing text, only what comes next\n\
         6. Use proper SQL syntax and formatting\n\
         7. Focus on common SQL patterns (SELECT, INSERT, UPDATE, DELETE)\n\
         8. No explanations, no markdown, SQL only\n\
         \n\
         Be intelligent and context-aware. Predict the most useful completion."
    )
}

/// User-turn message carrying the editor content for a completion request.
pub fn completion_user_message(partial_query: &str, cursor_position: usize) -> String {
    format!(
        "Partial query: \"{partial_query}\"\nCursor position: {cursor_position}\n\nWhat should I suggest for completion?"
    )
}

/// System context for an assistant conversation turn, grounded in the
/// current schema and the user's visible editor buffer.
pub fn conversation_context(schema: &str, current_query: Option<&str>) -> String {
    let schema = if schema.is_empty() {
        "No schema information available"
    } else {
        schema
    };

    let editor_state = match current_query {
        Some(query) if !query.trim().is_empty() => format!("```sql\n{query}\n```"),
        _ => "No query currently in the editor".to_string(),
    };

    format!(
        "You are a helpful SQL database assistant. You help users write SQL queries and understand their database.\n\
         \n\
         Database Schema:\n\
         {schema}\n\
         \n\
         Current SQL Query in Editor:\n\
         {editor_state}\n\
         \n\
         Guidelines:\n\
         1. When writing SQL queries, always wrap them in markdown code blocks with sql language specification\n\
         2. Be helpful and explain your reasoning\n\
         3. Always consider the user's database schema when suggesting queries\n\
         4. If a user asks about their data, refer to the actual table and column names from the schema\n\
         5. When providing SQL code, use REAL values from the schema, never placeholders like column_name or 'value'\n\
         6. Make queries executable without user editing\n\
         7. You can see what the user is currently working on in their SQL editor; use this context to \
         improve, debug, or extend their current query and to answer questions about what it does\n\
         \n\
         The user is working with a PostgreSQL database. You can see their current SQL query above."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_context_embeds_schema() {
        let context = completion_context("Table: dummytable\n  - id (integer, not null)");
        assert!(context.contains("Table: dummytable"));
        assert!(context.contains("Return ONLY the completion text"));
    }

    #[test]
    fn test_completion_context_without_schema() {
        assert!(completion_context("").contains("No schema available"));
    }

    #[test]
    fn test_conversation_context_embeds_buffer_verbatim() {
        let context = conversation_context("Table: t", Some("SELECT *\nFROM t;"));
        assert!(context.contains("```sql\nSELECT *\nFROM t;\n```"));
        assert!(context.contains("Table: t"));
    }

    #[test]
    fn test_conversation_context_marks_missing_buffer() {
        for buffer in [None, Some("   ")] {
            let context = conversation_context("Table: t", buffer);
            assert!(context.contains("No query currently in the editor"));
        }
    }
}
