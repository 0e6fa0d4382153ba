use serde::{Deserialize, Serialize};

/// Languages the textbook corpus is published in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ur,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ur => "ur",
        }
    }

    pub fn from_code(code: &str) -> Option<Language> {
        match code {
            "en" => Some(Language::En),
            "ur" => Some(Language::Ur),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.code())
    }
}

/// Canned texts the generator needs for one language: the grounding
/// instruction, the model's scripted acknowledgment, and the fixed
/// no-information answer.
#[derive(Debug, Clone, Copy)]
pub struct LanguagePack {
    pub system_prompt: &'static str,
    pub acknowledgment: &'static str,
    pub no_answer: &'static str,
}

const EN_PACK: LanguagePack = LanguagePack {
    system_prompt: "You are a helpful assistant for the Physical AI & Humanoid Robotics textbook.\n\
Answer questions ONLY based on the provided context from the textbook.\n\
If the context doesn't contain relevant information to answer the question, say:\n\
\"I don't have information about that in this textbook.\"\n\n\
Be concise and accurate. Always cite which section the information comes from.",
    acknowledgment: "I understand. I will only answer based on the provided textbook context \
and clearly indicate when I don't have relevant information.",
    no_answer: "I don't have information about that in this textbook.",
};

const UR_PACK: LanguagePack = LanguagePack {
    system_prompt: "آپ فزیکل اے آئی اور ہیومنائیڈ روبوٹکس نصابی کتاب کے لیے ایک مددگار اسسٹنٹ ہیں۔\n\
سوالات کا جواب صرف نصابی کتاب سے فراہم کردہ متن کی بنیاد پر دیں۔\n\
اگر متن میں سوال کا جواب دینے کے لیے متعلقہ معلومات نہیں ہیں، تو کہیں:\n\
\"اس نصابی کتاب میں اس کے بارے میں معلومات نہیں ہیں۔\"\n\n\
مختصر اور درست جواب دیں۔ ہمیشہ بتائیں کہ معلومات کس سیکشن سے ہے۔\n\
جواب اردو میں دیں۔",
    acknowledgment: "میں سمجھ گیا۔ میں صرف فراہم کردہ نصابی کتاب کے متن کی بنیاد پر جواب دوں گا \
اور واضح طور پر بتاؤں گا جب متعلقہ معلومات نہیں ہوں گی۔",
    no_answer: "اس نصابی کتاب میں اس کے بارے میں معلومات نہیں ہیں۔",
};

const PACKS: &[(Language, LanguagePack)] = &[(Language::En, EN_PACK), (Language::Ur, UR_PACK)];

/// Resolves the pack for a language, falling back to English when a language
/// carries no dedicated texts.
pub fn language_pack(language: Language) -> &'static LanguagePack {
    PACKS
        .iter()
        .find(|(candidate, _)| *candidate == language)
        .map(|(_, pack)| pack)
        .unwrap_or(&EN_PACK)
}

/// Intro-section title used for content that precedes the first `##` header.
pub fn intro_title(language: Language) -> &'static str {
    match language {
        Language::En => "Introduction",
        Language::Ur => "تعارف",
    }
}

/// Locale-aware URL prefix for a chapter page.
pub fn docs_url_path(language: Language, chapter_id: &str) -> String {
    match language {
        Language::En => format!("/docs/{chapter_id}"),
        Language::Ur => format!("/ur/docs/{chapter_id}"),
    }
}
