use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TTS_BASE_URL: &str = "https://texttospeech.googleapis.com";
const DEFAULT_TTS_VOICE: &str = "pt-BR-Neural2-A";
const TTS_LANGUAGE: &str = "pt-BR";
// Long conversation histories are normal input.
const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GOOGLE_API_KEY não encontrada. Crie um arquivo .env com: GOOGLE_API_KEY=sua_chave_aqui")]
    MissingApiKey,

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Sampling parameters sent as `generationConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    pub temperature: f64,
    pub max_output_tokens: u32,
}

impl GenerationSettings {
    pub const NORMAL: Self = Self { temperature: 0.2, max_output_tokens: 512 };
    pub const ACCESSIBILITY: Self = Self { temperature: 0.1, max_output_tokens: 1024 };
    pub const DIAGNOSTIC: Self = Self { temperature: 0.0, max_output_tokens: 20 };
}

/// Deployment presets. They differ only in data, never in code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Fmp,
    SenaChat,
}

impl Variant {
    /// Unknown names fall back to the FMP deployment.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "senachat" | "senac" => Variant::SenaChat,
            _ => Variant::Fmp,
        }
    }

    pub fn assistant_name(self) -> &'static str {
        match self {
            Variant::Fmp => "FMPConnect",
            Variant::SenaChat => "SenaChat",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Variant::Fmp => "gemini-2.0-flash",
            Variant::SenaChat => "gemini-2.5-flash-preview-09-2025",
        }
    }

    pub fn system_instruction(self) -> &'static str {
        match self {
            Variant::Fmp => FMP_INSTRUCTION,
            Variant::SenaChat => SENACHAT_INSTRUCTION,
        }
    }

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Variant::Fmp => FMP_KEYWORDS,
            Variant::SenaChat => SENACHAT_KEYWORDS,
        }
    }

    pub fn refusal(self) -> &'static str {
        match self {
            Variant::Fmp => "Sou o FMPConnect e respondo apenas sobre a Faculdade Municipal de Palhoça.",
            Variant::SenaChat => {
                "Sou o SenaChat e respondo apenas sobre cursos e tecnologia do SENAC - Jovem Programador."
            }
        }
    }

    fn tts_by_default(self) -> bool {
        matches!(self, Variant::Fmp)
    }
}

/// Immutable per-process configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub variant: Variant,
    pub model: String,
    pub system_instruction: String,
    pub keywords: Vec<String>,
    pub refusal: String,
    pub scope_filter: bool,
    pub gemini_base_url: String,
    pub tts_base_url: String,
    pub tts_enabled: bool,
    pub tts_voice: String,
    pub tts_language: String,
    pub upstream_timeout: Duration,
    pub diag_timeout: Duration,
    pub max_body_bytes: usize,
    pub cors_origins: Vec<String>,
    pub public_dir: PathBuf,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("GOOGLE_API_KEY").ok_or(ConfigError::MissingApiKey)?;
        let variant = get("ASSISTANT_VARIANT")
            .map(|v| Variant::parse(&v))
            .unwrap_or(Variant::Fmp);

        let scope_filter = parse_flag("SCOPE_FILTER", get("SCOPE_FILTER"), false)?;
        let tts_enabled = parse_flag("TTS_ENABLED", get("TTS_ENABLED"), variant.tts_by_default())?;
        let upstream_timeout = parse_timeout("UPSTREAM_TIMEOUT_SECS", get("UPSTREAM_TIMEOUT_SECS"), 30)?;
        let diag_timeout = parse_timeout("DIAG_TIMEOUT_SECS", get("DIAG_TIMEOUT_SECS"), 20)?;
        let max_body_bytes = parse_num::<usize>("MAX_BODY_BYTES", get("MAX_BODY_BYTES"), DEFAULT_MAX_BODY_BYTES)?;
        let cors_origins = parse_origins(get("CORS_ORIGINS"));
        let port = parse_num::<u16>("PORT", get("PORT"), 5000)?;

        Ok(Self {
            api_key,
            variant,
            model: get("GEMINI_MODEL").unwrap_or_else(|| variant.default_model().to_string()),
            system_instruction: variant.system_instruction().to_string(),
            keywords: variant.keywords().iter().map(|k| k.to_string()).collect(),
            refusal: variant.refusal().to_string(),
            scope_filter,
            gemini_base_url: get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            tts_base_url: get("TTS_BASE_URL").unwrap_or_else(|| DEFAULT_TTS_BASE_URL.to_string()),
            tts_enabled,
            tts_voice: get("TTS_VOICE").unwrap_or_else(|| DEFAULT_TTS_VOICE.to_string()),
            tts_language: TTS_LANGUAGE.to_string(),
            upstream_timeout,
            diag_timeout,
            max_body_bytes,
            cors_origins,
            public_dir: PathBuf::from(get("PUBLIC_DIR").unwrap_or_else(|| "./public".to_string())),
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
        })
    }

    /// Credential as it may appear in logs and diagnostics.
    pub fn masked_key(&self) -> String {
        mask_key(&self.api_key)
    }
}

pub fn mask_key(key: &str) -> String {
    if key.chars().count() > 10 {
        let prefix: String = key.chars().take(8).collect();
        format!("{}...", prefix)
    } else {
        "***".to_string()
    }
}

fn parse_flag(key: &'static str, value: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue { key, value: v }),
        },
    }
}

fn parse_timeout(key: &'static str, value: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    match parse_num::<u64>(key, value, default)? {
        0 => Err(ConfigError::InvalidValue { key, value: "0".to_string() }),
        secs => Ok(Duration::from_secs(secs)),
    }
}

/// Comma separated list; `*` allows any origin.
fn parse_origins(value: Option<String>) -> Vec<String> {
    let origins: Vec<String> = value
        .unwrap_or_else(|| "*".to_string())
        .split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();
    if origins.is_empty() {
        vec!["*".to_string()]
    } else {
        origins
    }
}

fn parse_num<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.parse::<T>().map_err(|_| ConfigError::InvalidValue { key, value: v }),
    }
}

const FMP_KEYWORDS: &[&str] = &[
    "fmp", "faculdade municipal", "palhoça", "palhoca", "fmpsc",
    "administração", "administracao", "pedagogia", "processos gerenciais",
    "gestão", "gestao", "turismo", "ads", "análise e desenvolvimento", "analise e desenvolvimento",
    "sistemas", "curso", "graduação", "graduacao", "pós", "pos", "pós-graduação",
    "inscri", "matr", "vestibular", "edital", "vaga", "bolsa", "gratuito",
    "endereço", "endereco", "local", "contato", "telefone", "email", "e-mail",
];

const SENACHAT_KEYWORDS: &[&str] = &[
    "senac", "jovem programador", "curso", "aula", "programa", "código", "codigo",
    "tecnologia", "python", "javascript", "java", "html", "css", "banco de dados",
    "inscri", "matr", "certificado", "carga horária", "carga horaria", "horário", "horario",
];

const SENACHAT_INSTRUCTION: &str = "Você é o SenaChat, um assistente virtual amigável e prestativo do SENAC - JOVEM PROGRAMADOR.

Seu papel é:
- Ajudar estudantes com dúvidas sobre cursos e tecnologia
- Responder de forma clara e objetiva
- Ser educado, profissional e motivador
- Quando não souber algo, ser honesto e sugerir onde encontrar a informação

Responda sempre de forma conversacional e natural.";

const FMP_INSTRUCTION: &str = "Você é o FMPConnect, o assistente virtual oficial da Faculdade Municipal de Palhoça (FMP).

IDENTIDADE E PERSONALIDADE
Nome: FMPConnect
Tom e Estilo: Profissional, acolhedor, acadêmico (mas acessível), informativo e orgulhoso de representar uma instituição pública municipal.
Propósito: Fornecer informações precisas sobre cursos de graduação, pós-graduação, processos seletivos, localização e contatos da FMP.

BASE DE CONHECIMENTO - FACULDADE MUNICIPAL DE PALHOÇA (FMP)

Localização e Contato
Site Oficial: https://fmpsc.edu.br/
Endereço: Rua João Pereira dos Santos, 99 - Ponte do Imaruim - Palhoça - SC, CEP 88130-475.
Telefone: (48) 3220-0376
E-mail Geral: contato@fmpsc.edu.br
Horário de Atendimento: Geralmente Matutino, Vespertino e Noturno (confirme no site para horários específicos de secretaria).

Cursos de Graduação (Presencial)
1. Administração (Bacharelado) - Duração: 4 anos - Turnos: Matutino e Noturno
2. Pedagogia (Licenciatura) - Duração: 4 anos - Turnos: Matutino e Noturno
3. Processos Gerenciais (Tecnólogo) - Duração: 2 anos - Turno: Matutino
4. Análise e Desenvolvimento de Sistemas - ADS (Tecnólogo) - Duração: 2,5 anos - Turno: Matutino
Atenção: O curso de Gestão de Turismo consta como indisponível/ativo apenas em registros antigos, verifique editais atuais.

Pós-Graduação (Especialização)
1. Gestão Escolar (Duração: 1 ano)
2. Gestão Empresarial (Duração: 1 ano)

Sobre a Instituição
Missão: Produzir e disseminar conhecimento, promovendo o desenvolvimento humano, intelectual, tecnológico e sustentável de Palhoça.
Diferencial: Instituição pública municipal. Historicamente destina grande parte das vagas (aprox. 80%) para alunos oriundos de escolas públicas residentes em Palhoça (consulte editais para regras atuais de cotas).

Ingresso / Vestibular
A forma de ingresso principal é através de Editais de Processo Seletivo (Vestibular) ou Vagas Remanescentes.
Os editais são publicados periodicamente no site oficial na aba \"Editais\" ou \"Vestibular\".
Sempre oriente o usuário a ler o edital vigente para datas e regras de isenção.

REGRAS DE RESPOSTA
1. Link Obrigatório: Sempre que falar sobre inscrições, editais ou detalhes curriculares, forneça: https://fmpsc.edu.br/
2. Não invente datas: Se perguntarem \"quando é a prova?\", diga que é necessário verificar o edital aberto no site, pois as datas mudam a cada semestre.
3. Fora do Escopo: Perguntas sobre outros assuntos (futebol, política nacional, receitas) devem ser gentilmente recusadas com: \"Sou o FMPConnect e respondo apenas sobre a Faculdade Municipal de Palhoça.\"
4. Clareza: Seja direto. Se perguntarem o endereço, dê o endereço completo.

EXEMPLOS DE INTERAÇÃO
Usuário: \"Quais cursos tem?\"
FMPConnect: \"A FMP oferece cursos de graduação presencial: Administração (Bacharelado), Pedagogia (Licenciatura), Processos Gerenciais (Tecnólogo) e Análise e Desenvolvimento de Sistemas (ADS). Também possuímos pós-graduação em Gestão Escolar e Gestão Empresarial. Saiba mais em: https://fmpsc.edu.br/\"

Usuário: \"Onde fica?\"
FMPConnect: \"A FMP fica na Ponte do Imaruim, em Palhoça. O endereço é Rua João Pereira dos Santos, 99. O CEP é 88130-475.\"";

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig::from_lookup(|key| match key {
        "GOOGLE_API_KEY" => Some("AIzaTestKey1234567890".to_string()),
        _ => None,
    })
    .expect("test config")
}
