use std::collections::HashSet;

/// Characters that separate words: punctuation, whitespace and the numero sign.
/// Apostrophes are kept so contractions reach the stop word filter whole.
pub const DEFAULT_DELIMITERS: &str = "`~!@\"#№$;:%^&?*()-_=+<>,.\\|/[]{} \r\n\t";

/// Built-in stop word tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    English,
    Russian,
}

impl Language {
    /// Resolves an ISO 639-1 code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "en" => Some(Self::English),
            "ru" => Some(Self::Russian),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Russian => "ru",
        }
    }

    pub fn stop_words(&self) -> &'static [&'static str] {
        match self {
            Self::English => ENGLISH_STOP_WORDS,
            Self::Russian => RUSSIAN_STOP_WORDS,
        }
    }
}

/// Splits text into lowercase words and drops stop words.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    delimiters: String,
    stop_words: HashSet<String>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

impl Tokenizer {
    /// Creates a tokenizer with the default delimiters and the given stop words.
    /// Stop words are matched case-insensitively.
    pub fn new<I, S>(stop_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            delimiters: DEFAULT_DELIMITERS.to_string(),
            stop_words: stop_words
                .into_iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn for_language(language: Language) -> Self {
        Self::new(language.stop_words().iter().copied())
    }

    pub fn with_delimiters(mut self, delimiters: impl Into<String>) -> Self {
        self.delimiters = delimiters.into();
        self
    }

    pub fn delimiters(&self) -> &str {
        &self.delimiters
    }

    /// Stop words in sorted order.
    pub fn stop_words(&self) -> Vec<String> {
        let mut words: Vec<String> = self.stop_words.iter().cloned().collect();
        words.sort();
        words
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Returns the words of `text` in order, lowercased, without stop words.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| self.delimiters.contains(c))
            .filter(|word| !word.is_empty() && !self.stop_words.contains(*word))
            .map(str::to_string)
            .collect()
    }
}

const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "a's", "able", "about", "above", "according", "across", "actually", "after",
    "afterwards", "again", "against", "ain't", "all", "allow", "allows", "almost", "alone",
    "along", "already", "also", "although", "always", "am", "among", "amongst", "an", "and",
    "another", "any", "anybody", "anyhow", "anyone", "anything", "anyway", "anywhere", "apart",
    "are", "aren't", "around", "as", "aside", "ask", "asking", "at", "away", "be", "became",
    "because", "become", "becomes", "been", "before", "behind", "being", "below", "beside",
    "besides", "between", "beyond", "both", "but", "by", "c'mon", "came", "can", "can't",
    "cannot", "could", "couldn't", "did", "didn't", "do", "does", "doesn't", "doing", "don't",
    "done", "down", "during", "each", "either", "else", "enough", "even", "ever", "every",
    "for", "from", "further", "get", "gets", "getting", "go", "goes", "going", "gone", "got",
    "had", "hadn't", "has", "hasn't", "have", "haven't", "having", "he", "he's", "hello",
    "hence", "her", "here", "here's", "hers", "herself", "hi", "him", "himself", "his", "how",
    "however", "i", "i'd", "i'll", "i'm", "i've", "ie", "if", "in", "into", "is", "isn't", "it",
    "it'd", "it'll", "it's", "its", "itself", "just", "let's", "me", "might", "more", "most",
    "much", "must", "my", "myself", "no", "nor", "not", "now", "of", "off", "often", "oh", "ok",
    "okay", "on", "once", "only", "onto", "or", "other", "others", "otherwise", "ought", "our",
    "ours", "ourselves", "out", "over", "own", "please", "quite", "rather", "really", "same",
    "say", "says", "shall", "she", "should", "shouldn't", "since", "so", "some", "somebody",
    "someone", "something", "such", "than", "thank", "thanks", "that", "that's", "the", "their",
    "theirs", "them", "themselves", "then", "there", "there's", "these", "they", "they'd",
    "they'll", "they're", "they've", "this", "those", "though", "through", "thus", "to", "too",
    "toward", "towards", "under", "until", "up", "upon", "us", "very", "via", "was", "wasn't",
    "we", "we'd", "we'll", "we're", "we've", "well", "were", "weren't", "what", "what's",
    "whatever", "when", "where", "where's", "whether", "which", "while", "who", "who's", "whom",
    "whose", "why", "will", "with", "within", "without", "won't", "would", "wouldn't", "yes",
    "yet", "you", "you'd", "you'll", "you're", "you've", "your", "yours", "yourself",
    "yourselves",
];

const RUSSIAN_STOP_WORDS: &[&str] = &[
    "а", "без", "более", "бы", "был", "была", "были", "было", "быть", "в", "вам", "вас", "весь",
    "во", "вот", "все", "всего", "всех", "вы", "где", "да", "даже", "для", "до", "его", "ее",
    "если", "есть", "еще", "ж", "же", "за", "здесь", "и", "из", "или", "им", "их", "к", "как",
    "ко", "когда", "кто", "ли", "либо", "мне", "может", "мы", "на", "надо", "наш", "не", "него",
    "нее", "нет", "ни", "них", "но", "ну", "о", "об", "однако", "он", "она", "они", "оно", "от",
    "очень", "по", "под", "при", "с", "со", "так", "также", "такой", "там", "те", "тем", "то",
    "того", "тоже", "той", "только", "том", "ты", "у", "уже", "хотя", "чего", "чей", "чем",
    "что", "чтобы", "чье", "чья", "эта", "эти", "это", "я",
];
