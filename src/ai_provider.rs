use clap::ValueEnum;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum AiProvider {
    /// OpenAI互換 chat/completions API
    Openai,
    /// ローカルの claude CLI
    Claude,
}

impl AiProvider {
    pub fn name(&self) -> &'static str {
        match self {
            AiProvider::Openai => "openai",
            AiProvider::Claude => "claude",
        }
    }
}

impl std::fmt::Display for AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
