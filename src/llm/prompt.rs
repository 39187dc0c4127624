//! Prompt construction for LLM requests.
//!
//! Builds the routing prompt over the catalog descriptor block and the
//! SQL generation prompt with its `SQLQuery:` / `SQLResult:` / `Answer:`
//! completion scaffold.

use crate::llm::types::Message;

/// Routing prompt template. `{question}` and `{catalog}` are substituted.
const ROUTING_PROMPT_TEMPLATE: &str = "From the table below, find the database (in column database) which will contain the data
(in corresponding column_names) to answer the question {question} \n{catalog}
Give your answer as database ==
Also, give your answer as database.table == ";

/// SQL generation prompt template.
///
/// `{dialect}`, `{table_info}` and `{input}` are substituted.
const SQL_PROMPT_TEMPLATE: &str = r#"Given an input question, first create a syntactically correct {dialect} query to run, then look at the results of the query and return the answer.
Do not append 'Query:' to SQLQuery.
Do not use Backquotes in SQL queries, please use double quotes when needed.
Display SQLResult after the query is run in plain English that users can understand.
Provide answer in simple English statement.
Only use the following tables:
{table_info}
Question: {input}"#;

/// Label that precedes generated SQL.
pub const SQL_QUERY_LABEL: &str = "SQLQuery:";

/// Label that precedes the rendered result rows.
pub const SQL_RESULT_LABEL: &str = "SQLResult:";

/// Label that precedes the final answer.
pub const ANSWER_LABEL: &str = "Answer:";

/// Marker identifying the routing prompt.
pub const ROUTING_MARKER: &str = "Give your answer as database ==";

/// Builds the routing prompt for `question` over the rendered catalog block.
pub fn build_routing_prompt(question: &str, catalog: &str) -> String {
    ROUTING_PROMPT_TEMPLATE
        .replace("{catalog}", catalog)
        .replace("{question}", question)
}

/// Builds the SQL generation prompt, ending with the `SQLQuery:` scaffold.
pub fn build_sql_prompt(dialect: &str, table_info: &str, question: &str) -> String {
    let input = format!("{question}\n{SQL_QUERY_LABEL}");
    SQL_PROMPT_TEMPLATE
        .replace("{dialect}", dialect)
        .replace("{table_info}", table_info)
        .replace("{input}", &input)
}

/// Extends the SQL prompt with the executed query and its rendered rows,
/// leaving the `Answer:` label for the model to complete.
pub fn build_summary_prompt(sql_prompt: &str, sql: &str, rendered_rows: &str) -> String {
    format!("{sql_prompt} {sql}\n{SQL_RESULT_LABEL} {rendered_rows}\n{ANSWER_LABEL}")
}

/// Wraps a prompt as the single user message sent to the model.
pub fn build_messages(prompt: impl Into<String>) -> Vec<Message> {
    vec![Message::user(prompt)]
}
