//! Text segmentation into bounded, overlapping chunks.
//!
//! Splitting prefers the coarsest boundary that fits: paragraphs first,
//! then sentences within oversized paragraphs, then words within
//! oversized sentences. A post-pass merges undersized neighbors and a
//! final pass injects a character overlap from each chunk's predecessor.
//! All sizes are measured in characters, and the result is deterministic
//! for identical input and configuration.

use regex::Regex;

/// One segment of a document's text, carrying its final 0-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub index: usize,
    pub text: String,
}

pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    paragraph_re: Regex,
    sentence_re: Regex,
}

fn char_count(s: &str) -> usize {
    s.chars().count()
}

/// First `n` characters of `s`, at a char boundary.
fn truncate_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Last `n` characters of `s`, at a char boundary.
fn tail_chars(s: &str, n: usize) -> &str {
    let total = char_count(s);
    if total <= n {
        return s;
    }
    match s.char_indices().nth(total - n) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        debug_assert!(chunk_size > 0);
        debug_assert!(chunk_overlap < chunk_size);
        Self {
            chunk_size,
            chunk_overlap,
            paragraph_re: Regex::new(r"\n\s*\n").expect("valid paragraph regex"),
            sentence_re: Regex::new(r"[.!?]+\s+").expect("valid sentence regex"),
        }
    }

    /// Segments `text` into ordered chunks. Empty input yields no chunks.
    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        tracing::debug!(len = text.len(), "splitting text into chunks");

        let mut candidates: Vec<String> = Vec::new();
        for paragraph in self.paragraph_re.split(text) {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            if char_count(paragraph) <= self.chunk_size {
                candidates.push(paragraph.to_string());
            } else {
                candidates.extend(self.split_by_sentences(paragraph));
            }
        }

        let merged = self.merge_small_chunks(candidates);
        let overlapped = self.apply_overlap(merged);

        tracing::debug!(chunks = overlapped.len(), "created chunks");
        overlapped
            .into_iter()
            .enumerate()
            .map(|(index, text)| TextChunk { index, text })
            .collect()
    }

    /// Splits on terminal punctuation followed by whitespace, keeping the
    /// punctuation with its sentence, and accumulates sentences until the
    /// next one would exceed `chunk_size`.
    fn split_by_sentences(&self, text: &str) -> Vec<String> {
        let mut sentences: Vec<&str> = Vec::new();
        let mut last_end = 0;
        for m in self.sentence_re.find_iter(text) {
            // The match is a punctuation run plus trailing whitespace;
            // the sentence ends after the punctuation.
            let punct_len: usize = m
                .as_str()
                .chars()
                .take_while(|c| !c.is_whitespace())
                .map(|c| c.len_utf8())
                .sum();
            sentences.push(&text[last_end..m.start() + punct_len]);
            last_end = m.end();
        }
        if last_end < text.len() {
            sentences.push(&text[last_end..]);
        }

        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_chars = 0;

        for sentence in sentences {
            let sentence = sentence.trim();
            if sentence.is_empty() {
                continue;
            }
            let sentence_chars = char_count(sentence);

            if current_chars + sentence_chars + 1 <= self.chunk_size {
                if !current.is_empty() {
                    current.push(' ');
                    current_chars += 1;
                }
                current.push_str(sentence);
                current_chars += sentence_chars;
                continue;
            }

            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_chars = 0;
            }
            if sentence_chars > self.chunk_size {
                chunks.extend(self.split_by_words(sentence));
            } else {
                current.push_str(sentence);
                current_chars = sentence_chars;
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    /// Word-boundary fallback for a single oversized sentence. A word
    /// longer than `chunk_size` is hard-truncated to `chunk_size`.
    fn split_by_words(&self, text: &str) -> Vec<String> {
        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_chars = 0;

        for word in text.split_whitespace() {
            let word_chars = char_count(word);

            if current_chars + word_chars + 1 <= self.chunk_size {
                if !current.is_empty() {
                    current.push(' ');
                    current_chars += 1;
                }
                current.push_str(word);
                current_chars += word_chars;
                continue;
            }

            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_chars = 0;
            }
            if word_chars > self.chunk_size {
                chunks.push(truncate_chars(word, self.chunk_size).to_string());
            } else {
                current.push_str(word);
                current_chars = word_chars;
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    /// Greedily merges chunks smaller than `chunk_size / 2` with their
    /// successors while the merged text stays within `chunk_size`.
    fn merge_small_chunks(&self, chunks: Vec<String>) -> Vec<String> {
        let mut merged: Vec<String> = Vec::new();
        let mut iter = chunks.into_iter().peekable();

        while let Some(mut current) = iter.next() {
            let mut current_chars = char_count(&current);
            while current_chars < self.chunk_size / 2 {
                match iter.peek() {
                    Some(next) if current_chars + 1 + char_count(next) <= self.chunk_size => {
                        let next = iter.next().expect("peeked");
                        current_chars += 1 + char_count(&next);
                        current.push(' ');
                        current.push_str(&next);
                    }
                    _ => break,
                }
            }
            merged.push(current);
        }
        merged
    }

    /// Prepends the trailing `chunk_overlap` characters of each chunk's
    /// predecessor (pre-overlap text), joined by a single space. Skipped
    /// when the predecessor is shorter than the overlap.
    fn apply_overlap(&self, chunks: Vec<String>) -> Vec<String> {
        if self.chunk_overlap == 0 || chunks.len() < 2 {
            return chunks;
        }
        let mut overlapped = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                overlapped.push(chunk.clone());
                continue;
            }
            let prev = &chunks[i - 1];
            if char_count(prev) >= self.chunk_overlap {
                let tail = tail_chars(prev, self.chunk_overlap);
                overlapped.push(format!("{} {}", tail, chunk));
            } else {
                overlapped.push(chunk.clone());
            }
        }
        overlapped
    }
}
