//! System prompt for the space-biology assistant.

use std::fmt::Write;

use crate::models::RetrievedDocument;

const PERSONA: &str = "You are Dr. Aris, an AI assistant specialized in space biology. Your areas of expertise are:
- Astrobiology and space biology
- Adaptation of organisms to extreme environments
- Agriculture and cultivation under spaceflight conditions
- Space missions and scientific research
- Effects of radiation and microgravity on biological systems

Your characteristics:
- You answer clearly and scientifically
- You cite studies and publications when they are available
- You are enthusiastic about the subject
- You explain complex concepts in an accessible way
- You ground your answers in scientific evidence";

const CONTEXT_INTRO: &str =
    "Use the following scientific publications to support your answers when relevant:";

const CLOSING: &str =
    "Answer concisely but informatively, always keeping scientific rigor.";

const MISSING: &str = "N/A";

/// Formatted block of retrieved publications; empty when there are none.
pub fn format_documents(docs: &[RetrievedDocument]) -> String {
    if docs.is_empty() {
        return String::new();
    }

    let mut out = String::from("\n\nRelevant scientific publications:\n\n");
    for doc in docs {
        let authors = join_or_missing(&doc.authors);
        let year = doc
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| MISSING.to_string());
        let abstract_text = doc
            .abstract_text
            .as_deref()
            .filter(|a| !a.is_empty())
            .unwrap_or(MISSING);
        let keywords = join_or_missing(&doc.keywords);

        // Writing into a String cannot fail.
        let _ = writeln!(out, "Title: {}", doc.title);
        let _ = writeln!(out, "Authors: {}", authors);
        let _ = writeln!(out, "Year: {}", year);
        let _ = writeln!(out, "Abstract: {}", abstract_text);
        let _ = writeln!(out, "Keywords: {}\n", keywords);
    }
    out
}

fn join_or_missing(items: &[String]) -> String {
    if items.is_empty() {
        MISSING.to_string()
    } else {
        items.join(", ")
    }
}

pub fn build_system_prompt(docs: &[RetrievedDocument]) -> String {
    let context = format_documents(docs);
    let grounding = if context.is_empty() {
        String::new()
    } else {
        format!("{}{}", CONTEXT_INTRO, context)
    };
    format!("{}\n\n{}\n\n{}", PERSONA, grounding, CLOSING)
}
