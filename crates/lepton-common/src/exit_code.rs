/// Explains a process exit code in plain words.
pub fn code_to_error(code: i32) -> String {
    match code {
        0 => "Success".to_string(),
        1 => "General application error".to_string(),
        2 => "Shell misuse: missing keyword or command".to_string(),
        126 => "Command found but not executable".to_string(),
        127 => "Command not found".to_string(),
        130 => "Terminated by SIGINT (Ctrl+C)".to_string(),
        137 => "Terminated by SIGKILL, possibly out of memory (OOM)".to_string(),
        139 => "Terminated by SIGSEGV (segmentation fault)".to_string(),
        143 => "Terminated by SIGTERM".to_string(),
        128..=165 => format!("Terminated by fatal signal {}", code - 128),
        _ => format!("Unknown error with exit code {code}"),
    }
}
