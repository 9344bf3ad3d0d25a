use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, AppResult, ConfigError, FileError};

/// 运行阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    /// 抓取 APK 元数据并下载安装包
    Apk,
    /// 由 UI 上下文生成子提示并入库
    Prompts,
    /// 调用 LLM 生成测试文本
    Texts,
}

impl FromStr for PipelineStage {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "apk" => Ok(PipelineStage::Apk),
            "prompts" | "prompt" => Ok(PipelineStage::Prompts),
            "texts" | "text" => Ok(PipelineStage::Texts),
            other => Err(ConfigError::InvalidValue {
                field: "stage".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// LLM 接入方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// 自建聊天网关（modelType / message 协议）
    Gateway,
    /// 兼容 OpenAI 的服务
    OpenAi,
}

impl FromStr for LlmBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gateway" => Ok(LlmBackend::Gateway),
            "openai" => Ok(LlmBackend::OpenAi),
            other => Err(ConfigError::InvalidValue {
                field: "llm_backend".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// 子提示模板，`{name}` 为占位符
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PromptTemplates {
    /// 占位符: app_name, input_count, activity, component_types
    pub global: String,
    /// 占位符: component_order, component_type, resource_id, hint_text, current_text
    pub component: String,
    /// 占位符: direction, component_id, text, distance
    pub adjacent: String,
    /// 占位符: component_list, example_json
    pub restrictive: String,
    pub guiding: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            global: "We are testing the \"{app_name}\" Android app. The current page ({activity}) \
                     has {input_count} text input components of type {component_types}."
                .to_string(),
            component: "The {component_order} component is a {component_type} with resource id \
                        \"{resource_id}\", hint \"{hint_text}\" and current text \"{current_text}\"."
                .to_string(),
            adjacent: "To the {direction} of component \"{component_id}\" there is the text \
                       \"{text}\" at a distance of {distance} pixels."
                .to_string(),
            restrictive: "Generate one valid text input for each of these components: {component_list}. \
                          Answer with a JSON object in exactly this format:\n```json\n{example_json}\n```"
                .to_string(),
            guiding: "The inputs must be realistic and let the page be submitted successfully."
                .to_string(),
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 运行阶段
    pub stage: PipelineStage,
    /// 数据库地址
    pub database_url: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,

    // --- 应用市场 ---
    pub catalog_base_url: String,
    pub catalog_search_path: String,
    /// 版本详情页需要等待出现的元素
    pub detail_wait_selector: String,
    pub detail_wait_timeout_secs: u64,
    /// 搜索页加载后的固定等待时间
    pub search_settle_millis: u64,

    // --- 浏览器 ---
    pub chrome_executable: Option<String>,
    pub headless: bool,
    pub browser_lang: String,
    pub user_agent: String,

    // --- 下载 ---
    pub download_dir: String,
    pub download_timeout_secs: u64,
    pub download_poll_millis: u64,
    /// 下载中的临时文件后缀
    pub partial_suffixes: Vec<String>,
    /// 文件大小达到预期的比例即视为下载完成
    pub size_tolerance: f64,
    pub target_arch: String,

    // --- 冷却 ---
    pub record_cooldown_millis: u64,
    pub connection_cooldown_millis: u64,

    // --- LLM 配置 ---
    pub llm_backend: LlmBackend,
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_gateway_url: String,
    pub models: Vec<String>,
    pub sequences_per_structure: u32,
    pub answer_attempts: u32,
    pub persist_retries: u32,
    /// 结构 5 所需的 UI 层级文件目录
    pub structure_doc_dir: String,
    /// 指定需要生成文本的应用，为空时从数据库读取
    pub app_ids: Vec<String>,

    // --- 子提示 ---
    /// UI 上下文 JSON 所在目录
    pub context_dir: String,
    pub prompt_templates: PromptTemplates,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stage: PipelineStage::Apk,
            database_url: "sqlite://apk_harvest.db".to_string(),
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            catalog_base_url: "https://apkcombo.com".to_string(),
            catalog_search_path: "/zh/search".to_string(),
            detail_wait_selector: "#download-tab".to_string(),
            detail_wait_timeout_secs: 10,
            search_settle_millis: 2000,
            chrome_executable: None,
            headless: true,
            browser_lang: "zh-CN".to_string(),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36".to_string(),
            download_dir: "apk".to_string(),
            download_timeout_secs: 60 * 60,
            download_poll_millis: 1000,
            partial_suffixes: vec![".crdownload".to_string()],
            size_tolerance: 0.95,
            target_arch: "arm64-v8a".to_string(),
            record_cooldown_millis: 1000,
            connection_cooldown_millis: 5000,
            llm_backend: LlmBackend::Gateway,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_gateway_url: "http://127.0.0.1:8682/api/chat/completions".to_string(),
            models: default_models(),
            sequences_per_structure: 3,
            answer_attempts: 5,
            persist_retries: 5,
            structure_doc_dir: "output/xml_dumps".to_string(),
            app_ids: Vec::new(),
            context_dir: "output/contexts".to_string(),
            prompt_templates: PromptTemplates::default(),
        }
    }
}

fn default_models() -> Vec<String> {
    [
        "gpt-4o",
        "Baichuan4",
        "Grok_2",
        "SPARK_4",
        "Deepseek-V1",
        "GLM-4P",
        "CLAUDE_OPUS_4",
        "LLAMA_4_MAVERICK_INSTRUCT",
    ]
    .iter()
    .map(|m| m.to_string())
    .collect()
}

impl Config {
    /// 读取配置：先加载 `PIPELINE_CONFIG` 指向的 TOML 文件（可选），再应用环境变量
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var("PIPELINE_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        base.with_env_overrides()
    }

    pub fn from_env() -> AppResult<Self> {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件读取配置，缺失字段使用默认值
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        toml::from_str(&content).map_err(|e| {
            AppError::File(FileError::TomlParseFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })
        })
    }

    fn with_env_overrides(self) -> AppResult<Self> {
        Ok(Self {
            stage: env_parse("PIPELINE_STAGE", self.stage)?,
            database_url: env_string("DATABASE_URL", self.database_url),
            verbose_logging: env_parse("VERBOSE_LOGGING", self.verbose_logging)?,
            output_log_file: env_string("OUTPUT_LOG_FILE", self.output_log_file),
            catalog_base_url: env_string("CATALOG_BASE_URL", self.catalog_base_url),
            catalog_search_path: env_string("CATALOG_SEARCH_PATH", self.catalog_search_path),
            detail_wait_selector: env_string("DETAIL_WAIT_SELECTOR", self.detail_wait_selector),
            detail_wait_timeout_secs: env_parse("DETAIL_WAIT_TIMEOUT_SECS", self.detail_wait_timeout_secs)?,
            search_settle_millis: env_parse("SEARCH_SETTLE_MILLIS", self.search_settle_millis)?,
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().or(self.chrome_executable),
            headless: env_parse("HEADLESS", self.headless)?,
            browser_lang: env_string("BROWSER_LANG", self.browser_lang),
            user_agent: env_string("USER_AGENT", self.user_agent),
            download_dir: env_string("DOWNLOAD_DIR", self.download_dir),
            download_timeout_secs: env_parse("DOWNLOAD_TIMEOUT_SECS", self.download_timeout_secs)?,
            download_poll_millis: env_parse("DOWNLOAD_POLL_MILLIS", self.download_poll_millis)?,
            partial_suffixes: env_list("PARTIAL_SUFFIXES", self.partial_suffixes),
            size_tolerance: env_parse("SIZE_TOLERANCE", self.size_tolerance)?,
            target_arch: env_string("TARGET_ARCH", self.target_arch),
            record_cooldown_millis: env_parse("RECORD_COOLDOWN_MILLIS", self.record_cooldown_millis)?,
            connection_cooldown_millis: env_parse("CONNECTION_COOLDOWN_MILLIS", self.connection_cooldown_millis)?,
            llm_backend: env_parse("LLM_BACKEND", self.llm_backend)?,
            llm_api_key: env_string("LLM_API_KEY", self.llm_api_key),
            llm_api_base_url: env_string("LLM_API_BASE_URL", self.llm_api_base_url),
            llm_gateway_url: env_string("LLM_GATEWAY_URL", self.llm_gateway_url),
            models: env_list("LLM_MODELS", self.models),
            sequences_per_structure: env_parse("SEQUENCES_PER_STRUCTURE", self.sequences_per_structure)?,
            answer_attempts: env_parse("ANSWER_ATTEMPTS", self.answer_attempts)?,
            persist_retries: env_parse("PERSIST_RETRIES", self.persist_retries)?,
            structure_doc_dir: env_string("STRUCTURE_DOC_DIR", self.structure_doc_dir),
            app_ids: env_list("APP_IDS", self.app_ids),
            context_dir: env_string("CONTEXT_DIR", self.context_dir),
            prompt_templates: self.prompt_templates,
        })
    }

    pub fn detail_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.detail_wait_timeout_secs)
    }

    pub fn search_settle(&self) -> Duration {
        Duration::from_millis(self.search_settle_millis)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn download_poll_interval(&self) -> Duration {
        Duration::from_millis(self.download_poll_millis)
    }

    pub fn record_cooldown(&self) -> Duration {
        Duration::from_millis(self.record_cooldown_millis)
    }

    pub fn connection_cooldown(&self) -> Duration {
        Duration::from_millis(self.connection_cooldown_millis)
    }
}

fn env_string(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn env_list(name: &str, default: Vec<String>) -> Vec<String> {
    match std::env::var(name) {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => default,
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: name.to_string(),
            value: raw,
            expected_type: std::any::type_name::<T>().to_string(),
        }),
        Err(_) => Ok(default),
    }
}
