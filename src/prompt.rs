//! Instruction text for the prompt-evolution chat call.

pub const SYSTEM_INSTRUCTION: &str = "You are a creative assistant generating prompts for AI image generation. \
Your goal is to create a series of wallpapers that are beautiful, cinematic, \
and suitable as desktop backgrounds. Each prompt should:\n\
- Be a single descriptive sentence or two.\n\
- Contain a clear subject or scene, a mood, and stylistic details.\n\
- Be visually striking but not too busy.\n\
- Use descriptive words like 'cinematic wide shot', 'high resolution', \
'painterly softness', 'photorealistic detail', etc.\n\
- Evolve subtly from the previous prompt (if provided) by developing the same scene, \
shifting the mood, or introducing a new element.";

/// User message for the next generation, embedding the previous prompt when
/// one exists so the series keeps continuity.
pub fn user_message(last_prompt: Option<&str>) -> String {
    let mut msg = String::from("Generate the next prompt in this evolving wallpaper series.");
    if let Some(last) = last_prompt {
        msg.push_str("\nPrevious prompt:\n");
        msg.push_str(last);
    }
    msg
}
