//! Keyword heuristic deciding whether a request asks for code.

/// Substrings that mark a request as a code task.
pub const CODE_KEYWORDS: &[&str] = &[
    "code",
    "python",
    "function",
    "generate",
    "algorithm",
    "script",
    "write a program",
    "write code",
];

/// True when any keyword occurs anywhere in the request, ignoring case.
///
/// Requests that want code but use none of the keywords are treated as plain
/// questions.
pub fn is_code_task(request: &str) -> bool {
    let lowered = request.to_lowercase();
    CODE_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}
