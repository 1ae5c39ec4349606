/// 考试类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ExamType {
    /// 大学统一入学考试（JAMB UTME）
    Jamb,
    /// 西非高中毕业考试（WAEC WASSCE）
    Waec,
    /// 国家考试委员会考试
    Neco,
    /// 校级入学复试
    PostUtme,
}

impl ExamType {
    /// 获取题源 API 使用的考试类型键
    pub fn api_key(self) -> &'static str {
        match self {
            ExamType::Jamb => "utme",
            ExamType::Waec => "wassce",
            ExamType::Neco => "neco",
            ExamType::PostUtme => "post-utme",
        }
    }

    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            ExamType::Jamb => "JAMB",
            ExamType::Waec => "WAEC",
            ExamType::Neco => "NECO",
            ExamType::PostUtme => "POST-UTME",
        }
    }

    /// 支持的全部考试类型（回填遍历顺序，保持确定性）
    pub fn all() -> &'static [ExamType] {
        &[
            ExamType::Jamb,
            ExamType::Waec,
            ExamType::Neco,
            ExamType::PostUtme,
        ]
    }

    /// 尝试从字符串解析考试类型（接受标准名称和 API 键）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "jamb" | "utme" => Some(ExamType::Jamb),
            "waec" | "wassce" => Some(ExamType::Waec),
            "neco" => Some(ExamType::Neco),
            "post-utme" | "post utme" | "postutme" => Some(ExamType::PostUtme),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_accepts_both_forms() {
        assert_eq!(ExamType::from_str("JAMB"), Some(ExamType::Jamb));
        assert_eq!(ExamType::from_str("utme"), Some(ExamType::Jamb));
        assert_eq!(ExamType::from_str("wassce"), Some(ExamType::Waec));
        assert_eq!(ExamType::from_str("Post UTME"), Some(ExamType::PostUtme));
        assert_eq!(ExamType::from_str("gaokao"), None);
    }

    #[test]
    fn test_api_key_roundtrip() {
        for exam_type in ExamType::all() {
            assert_eq!(ExamType::from_str(exam_type.api_key()), Some(*exam_type));
        }
    }
}
