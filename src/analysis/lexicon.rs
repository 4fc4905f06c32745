//! Fixed Korean word lists used by the linguistic feature extractors.

/// Positive sentiment markers, matched as substrings of lower-cased text.
pub const POSITIVE_WORDS: &[&str] = &[
    "좋아", "좋아요", "좋다", "최고", "대박", "굿", "ㅋㅋ", "ㅎㅎ", "ㅋㅋㅋ", "ㅎㅎㅎ",
    "재밌", "재미있", "웃겨", "행복", "기뻐", "설레", "감사", "고마워", "사랑",
    "예뻐", "멋져", "귀여", "짱", "완전", "진짜", "너무", "정말", "완벽",
    "맛있", "신나", "기대", "보고싶", "想", "❤", "♥", "😊", "😍", "🥰",
    "ㅋ", "ㅎ", "히히", "크크", "캬", "오오", "우와", "와", "헐",
];

/// Negative sentiment markers.
pub const NEGATIVE_WORDS: &[&str] = &[
    "싫어", "싫다", "별로", "귀찮", "짜증", "화나", "슬퍼", "우울", "힘들",
    "피곤", "지쳐", "심심", "재미없", "노잼", "아쉽", "미안", "죄송", "sorry",
    "못", "안돼", "싫", "ㅠ", "ㅜ", "ㅠㅠ", "ㅜㅜ", "에휴", "흠", "음",
    "글쎄", "모르", "바빠", "나중에", "담에", "다음에",
];

/// Phrases that signal talking about oneself.
pub const SELF_DISCLOSURE_WORDS: &[&str] = &[
    "나는", "내가", "저는", "제가", "나도", "저도",
    "우리 가족", "우리 엄마", "우리 아빠", "우리 집",
    "내 친구", "내 생각", "솔직히", "사실",
    "어렸을 때", "예전에", "옛날에", "전에",
    "요즘 나", "나 요즘", "내 꿈", "내 취미",
    "좋아하는", "싫어하는", "무서워", "걱정",
    "비밀인데", "아무한테도", "너만", "너한테만",
];

/// Interrogative markers (regular expressions).
pub const QUESTION_PATTERNS: &[&str] = &[
    r"\?",
    "뭐야",
    "뭐해",
    "어때",
    "어디",
    "언제",
    "왜",
    "어떻게",
    "누구",
    "몇",
    "할래",
    "갈래",
    "먹을래",
    "볼래",
    "줄래",
    r"있어\?",
    r"없어\?",
    r"했어\?",
    "하는거야",
    "인거야",
    r"맞아\?",
    r"아니야\?",
    r"진짜\?",
    r"정말\?",
];

/// Label shown to the user for "me" in prompts and reports.
pub const ME_LABEL: &str = "나";
/// Label shown to the user for the other party.
pub const OTHER_LABEL: &str = "상대";
/// Unit of response speed values.
pub const MINUTES_UNIT: &str = "분";
