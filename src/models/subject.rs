/// 科目枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Subject {
    /// 数学
    Mathematics,
    /// 英语
    English,
    /// 物理
    Physics,
    /// 化学
    Chemistry,
    /// 生物
    Biology,
}

impl Subject {
    /// 获取题源 API 使用的科目键
    pub fn api_key(self) -> &'static str {
        match self {
            Subject::Mathematics => "mathematics",
            Subject::English => "english",
            Subject::Physics => "physics",
            Subject::Chemistry => "chemistry",
            Subject::Biology => "biology",
        }
    }

    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            Subject::Mathematics => "Mathematics",
            Subject::English => "English",
            Subject::Physics => "Physics",
            Subject::Chemistry => "Chemistry",
            Subject::Biology => "Biology",
        }
    }

    /// 支持的全部科目（回填遍历顺序，保持确定性）
    pub fn all() -> &'static [Subject] {
        &[
            Subject::Mathematics,
            Subject::English,
            Subject::Physics,
            Subject::Chemistry,
            Subject::Biology,
        ]
    }

    /// 尝试从字符串解析科目（精确匹配，大小写不敏感）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mathematics" | "maths" | "math" => Some(Subject::Mathematics),
            "english" => Some(Subject::English),
            "physics" => Some(Subject::Physics),
            "chemistry" => Some(Subject::Chemistry),
            "biology" => Some(Subject::Biology),
            _ => None,
        }
    }

    /// 智能查找科目（支持模糊匹配）
    pub fn find(s: &str) -> Option<Self> {
        // 先尝试精确匹配
        if let Some(subject) = Self::from_str(s) {
            return Some(subject);
        }

        // 模糊匹配
        let s_lower = s.to_lowercase();
        if s_lower.contains("math") {
            return Some(Subject::Mathematics);
        }
        if s_lower.contains("english") || s_lower.contains("use of english") {
            return Some(Subject::English);
        }
        if s_lower.contains("physic") {
            return Some(Subject::Physics);
        }
        if s_lower.contains("chem") {
            return Some(Subject::Chemistry);
        }
        if s_lower.contains("bio") {
            return Some(Subject::Biology);
        }

        None
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
