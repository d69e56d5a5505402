//! Turn rendering and the merge/split chunking policy.
//!
//! Each turn renders to text with structural markers. Consecutive turns
//! of one agent accumulate into a chunk until the token ceiling; short
//! turns merge with their neighbours, oversized turns split at marker
//! boundaries first and paragraph boundaries second, never inside a
//! fenced code block.

use chrono::{DateTime, Utc};

use engram_core::codec::approx_tokens;
use engram_core::models::{IngestOptions, Turn, TurnBlock};

/// A chunk before ids, clocks, and embeddings are attached.
#[derive(Debug, Clone)]
pub struct PendingChunk {
    pub turn_indices: Vec<u32>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub text: String,
    pub code_block_count: u32,
    pub tool_use_count: u32,
    pub agent_id: Option<String>,
    pub spawn_depth: u32,
}

/// Render one turn with structural markers.
pub fn render_turn(turn: &Turn, include_thinking: bool) -> String {
    let mut out = String::new();
    for block in &turn.blocks {
        match block {
            TurnBlock::User { text } => {
                out.push_str("[User]\n");
                out.push_str(text);
                out.push_str("\n\n");
            }
            TurnBlock::Assistant { text } => {
                out.push_str("[Assistant]\n");
                out.push_str(text);
                out.push_str("\n\n");
            }
            TurnBlock::Thinking { text } => {
                if include_thinking {
                    out.push_str("[Thinking]\n");
                    out.push_str(text);
                    out.push_str("\n\n");
                }
            }
            TurnBlock::ToolUse { name, input } => {
                out.push_str(&format!("[Tool:{name}]\n"));
                out.push_str(input);
                out.push_str("\n\n");
            }
            TurnBlock::ToolResult { name, output } => {
                out.push_str(&format!("[Result:{name}]\n"));
                out.push_str(output);
                out.push_str("\n\n");
            }
        }
    }
    out.trim_end().to_string()
}

fn count_code_blocks(text: &str) -> u32 {
    let fences = text.lines().filter(|l| l.trim_start().starts_with("```")).count();
    (fences / 2) as u32
}

fn count_tool_uses(turn: &Turn) -> u32 {
    turn.blocks
        .iter()
        .filter(|b| matches!(b, TurnBlock::ToolUse { .. }))
        .count() as u32
}

/// Cut the session's turns into pending chunks.
///
/// Chunks never span agents or spawn depths: a sub-agent's turns always
/// start a fresh chunk, so brief/debrief edges have clean endpoints.
pub fn chunk_turns(turns: &[Turn], options: &IngestOptions) -> Vec<PendingChunk> {
    let mut chunks: Vec<PendingChunk> = Vec::new();
    let mut current: Option<PendingChunk> = None;

    for turn in turns {
        let rendered = render_turn(turn, options.include_thinking);
        if rendered.is_empty() {
            continue;
        }
        let turn_tokens = approx_tokens(&rendered);

        // A chunk closes at an agent boundary, once it has reached the
        // merge threshold, or when the next turn would blow the ceiling.
        let boundary = current.as_ref().is_some_and(|c| {
            let tokens = approx_tokens(&c.text);
            c.agent_id != turn.agent_id
                || c.spawn_depth != turn.spawn_depth
                || tokens >= options.min_tokens_per_chunk
                || tokens + turn_tokens > options.max_tokens_per_chunk
        });
        if boundary {
            if let Some(done) = current.take() {
                chunks.extend(finalize(done, options));
            }
        }

        match current.as_mut() {
            Some(chunk) => {
                chunk.turn_indices.push(turn.index);
                chunk.end_time = turn.timestamp;
                chunk.text.push_str("\n\n");
                chunk.text.push_str(&rendered);
                chunk.code_block_count = count_code_blocks(&chunk.text);
                chunk.tool_use_count += count_tool_uses(turn);
            }
            None => {
                current = Some(PendingChunk {
                    turn_indices: vec![turn.index],
                    start_time: turn.timestamp,
                    end_time: turn.timestamp,
                    code_block_count: count_code_blocks(&rendered),
                    tool_use_count: count_tool_uses(turn),
                    agent_id: turn.agent_id.clone(),
                    spawn_depth: turn.spawn_depth,
                    text: rendered,
                });
            }
        }
    }
    if let Some(done) = current.take() {
        chunks.extend(finalize(done, options));
    }
    chunks
}

/// Split a finished accumulation if it overshot the ceiling. Short
/// chunks stay as they are: merging below `min_tokens` already happened
/// by accumulation.
fn finalize(chunk: PendingChunk, options: &IngestOptions) -> Vec<PendingChunk> {
    if approx_tokens(&chunk.text) <= options.max_tokens_per_chunk {
        return vec![chunk];
    }
    let pieces = split_text(&chunk.text, options.max_tokens_per_chunk);
    let n = pieces.len();
    pieces
        .into_iter()
        .map(|text| PendingChunk {
            turn_indices: chunk.turn_indices.clone(),
            start_time: chunk.start_time,
            end_time: chunk.end_time,
            code_block_count: count_code_blocks(&text),
            tool_use_count: if n > 0 { chunk.tool_use_count / n as u32 } else { 0 },
            agent_id: chunk.agent_id.clone(),
            spawn_depth: chunk.spawn_depth,
            text,
        })
        .collect()
}

fn is_marker_line(line: &str) -> bool {
    line.starts_with("[User]")
        || line.starts_with("[Assistant]")
        || line.starts_with("[Thinking]")
        || line.starts_with("[Tool:")
        || line.starts_with("[Result:")
}

/// Split at marker boundaries first, then paragraph boundaries, never
/// inside a fenced code block. A single unsplittable span stays whole.
pub fn split_text(text: &str, max_tokens: usize) -> Vec<String> {
    let sections = split_at(text, |line, in_fence| !in_fence && is_marker_line(line));
    let mut pieces: Vec<String> = Vec::new();
    for section in sections {
        if approx_tokens(&section) <= max_tokens {
            push_packed(&mut pieces, section, max_tokens);
            continue;
        }
        for paragraph in split_at(&section, |line, in_fence| !in_fence && line.is_empty()) {
            push_packed(&mut pieces, paragraph, max_tokens);
        }
    }
    pieces.retain(|p| !p.trim().is_empty());
    if pieces.is_empty() {
        vec![text.to_string()]
    } else {
        pieces
    }
}

/// Greedily pack a segment into the last piece while it fits.
fn push_packed(pieces: &mut Vec<String>, segment: String, max_tokens: usize) {
    if let Some(last) = pieces.last_mut() {
        if approx_tokens(last) + approx_tokens(&segment) <= max_tokens {
            last.push_str("\n\n");
            last.push_str(segment.trim_end());
            return;
        }
    }
    pieces.push(segment.trim_end().to_string());
}

/// Split text into segments starting wherever `is_boundary` fires,
/// tracking fence state so code blocks stay intact.
fn split_at(text: &str, is_boundary: impl Fn(&str, bool) -> bool) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_fence = false;
    for line in text.lines() {
        if is_boundary(line, in_fence) && !current.trim().is_empty() {
            segments.push(std::mem::take(&mut current));
        }
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.trim().is_empty() {
        segments.push(current);
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_fixtures::TranscriptBuilder;

    fn options() -> IngestOptions {
        IngestOptions::default()
    }

    #[test]
    fn renders_markers_per_block() {
        let (_, turns) = TranscriptBuilder::new("s", "p")
            .turn_with_blocks(vec![
                TurnBlock::User {
                    text: "read a file?".into(),
                },
                TurnBlock::Assistant {
                    text: "use fs".into(),
                },
                TurnBlock::ToolUse {
                    name: "Bash".into(),
                    input: "cat x".into(),
                },
                TurnBlock::ToolResult {
                    name: "Bash".into(),
                    output: "contents".into(),
                },
            ])
            .build();
        let text = render_turn(&turns[0], false);
        assert!(text.contains("[User]\nread a file?"));
        assert!(text.contains("[Assistant]\nuse fs"));
        assert!(text.contains("[Tool:Bash]\ncat x"));
        assert!(text.contains("[Result:Bash]\ncontents"));
    }

    #[test]
    fn thinking_is_opt_in() {
        let (_, turns) = TranscriptBuilder::new("s", "p")
            .turn_with_blocks(vec![
                TurnBlock::Thinking {
                    text: "hmm".into(),
                },
                TurnBlock::Assistant {
                    text: "answer".into(),
                },
            ])
            .build();
        assert!(!render_turn(&turns[0], false).contains("[Thinking]"));
        assert!(render_turn(&turns[0], true).contains("[Thinking]\nhmm"));
    }

    #[test]
    fn short_turns_merge_into_one_chunk() {
        let (_, turns) = TranscriptBuilder::new("s", "p")
            .exchange("How do I read a file in Node.js?", "Use fs.readFile.")
            .exchange("And write?", "fs.writeFile.")
            .build();
        let chunks = chunk_turns(&turns, &options());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].turn_indices, vec![0, 1]);
    }

    #[test]
    fn substantial_turns_each_get_a_chunk() {
        let body = "a sentence that easily clears the merge threshold ".repeat(10);
        let (_, turns) = TranscriptBuilder::new("s", "p")
            .exchange("first", &body)
            .exchange("second", &body)
            .exchange("third", &body)
            .exchange("fourth", &body)
            .build();
        let chunks = chunk_turns(&turns, &options());
        assert_eq!(chunks.len(), 4);
    }

    #[test]
    fn long_turns_get_their_own_chunks() {
        let filler = "word ".repeat(600); // ~750 tokens, above the ceiling
        let (_, turns) = TranscriptBuilder::new("s", "p")
            .exchange("first question", &filler)
            .exchange("second question", &filler)
            .build();
        let chunks = chunk_turns(&turns, &options());
        assert!(chunks.len() >= 2);
        // Indices stay monotone across chunks.
        let firsts: Vec<u32> = chunks.iter().map(|c| c.turn_indices[0]).collect();
        let mut sorted = firsts.clone();
        sorted.sort_unstable();
        assert_eq!(firsts, sorted);
    }

    #[test]
    fn agent_boundaries_always_cut() {
        let (_, turns) = TranscriptBuilder::new("s", "p")
            .exchange("spawn a helper", "spawning")
            .sub_agent_turn("a1", 1, "helper working")
            .exchange("thanks", "done")
            .build();
        let chunks = chunk_turns(&turns, &options());
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].agent_id, None);
        assert_eq!(chunks[1].agent_id.as_deref(), Some("a1"));
        assert_eq!(chunks[1].spawn_depth, 1);
        assert_eq!(chunks[2].agent_id, None);
    }

    #[test]
    fn split_never_cuts_a_code_fence() {
        let code = format!("```rust\n{}\n```", "let x = 1;\n".repeat(120));
        let text = format!("[Assistant]\nintro paragraph\n\n{code}\n\nclosing remark");
        let pieces = split_text(&text, 100);
        for piece in &pieces {
            let fences = piece
                .lines()
                .filter(|l| l.trim_start().starts_with("```"))
                .count();
            assert_eq!(fences % 2, 0, "unbalanced fence in piece: {piece}");
        }
    }

    #[test]
    fn code_blocks_are_counted() {
        let (_, turns) = TranscriptBuilder::new("s", "p")
            .exchange(
                "example?",
                "```js\nfs.readFile()\n```\nand also\n```js\nfs.promises\n```",
            )
            .build();
        let chunks = chunk_turns(&turns, &options());
        assert_eq!(chunks[0].code_block_count, 2);
    }
}
