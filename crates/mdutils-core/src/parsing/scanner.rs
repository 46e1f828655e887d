use regex::Regex;

/// Where the scanner currently is within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanState<S> {
    /// Everything before the first recognised header.
    Head,
    Section(S),
}

#[derive(Debug, Clone)]
pub struct HeaderRule<S> {
    pub pattern: Regex,
    pub state: S,
    /// The matching line is itself a data line of the new state.
    pub inclusive: bool,
}

/// An ordered list of header patterns; the first match wins.
#[derive(Debug, Clone)]
pub struct HeaderTable<S> {
    rules: Vec<HeaderRule<S>>,
}

impl<S: Copy> HeaderTable<S> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Adds a rule whose matching line only marks a section change.
    ///
    /// Patterns are compile-time constants of the format modules, so an
    /// invalid one is a programming error.
    pub fn header(mut self, pattern: &str, state: S) -> Self {
        self.rules.push(HeaderRule {
            pattern: compile(pattern),
            state,
            inclusive: false,
        });
        self
    }

    /// Adds a rule whose matching line is also the first record of the section.
    pub fn inclusive(mut self, pattern: &str, state: S) -> Self {
        self.rules.push(HeaderRule {
            pattern: compile(pattern),
            state,
            inclusive: true,
        });
        self
    }

    pub fn match_line(&self, line: &str) -> Option<&HeaderRule<S>> {
        self.rules.iter().find(|rule| rule.pattern.is_match(line))
    }
}

impl<S: Copy> Default for HeaderTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid header pattern '{pattern}': {e}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent<S, L> {
    /// A header line moved the scanner into `state`.
    Enter { state: S, line_num: usize, line: L },
    Data {
        state: ScanState<S>,
        line_num: usize,
        line: L,
    },
}

/// Lazily classifies lines by the section they belong to.
pub struct Scanner<'t, S, I: Iterator> {
    table: &'t HeaderTable<S>,
    lines: std::iter::Enumerate<I>,
    state: ScanState<S>,
    pending: Option<(usize, I::Item)>,
}

impl<'t, S, I, L> Scanner<'t, S, I>
where
    S: Copy,
    I: Iterator<Item = L>,
    L: AsRef<str> + Clone,
{
    pub fn new(lines: I, table: &'t HeaderTable<S>) -> Self {
        Self {
            table,
            lines: lines.enumerate(),
            state: ScanState::Head,
            pending: None,
        }
    }
}

impl<S, I, L> Iterator for Scanner<'_, S, I>
where
    S: Copy + PartialEq,
    I: Iterator<Item = L>,
    L: AsRef<str> + Clone,
{
    type Item = ScanEvent<S, L>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((line_num, line)) = self.pending.take() {
            return Some(ScanEvent::Data {
                state: self.state,
                line_num,
                line,
            });
        }

        let (idx, line) = self.lines.next()?;
        let line_num = idx + 1;
        match self.table.match_line(line.as_ref()) {
            Some(rule) if rule.inclusive && self.state == ScanState::Section(rule.state) => {
                Some(ScanEvent::Data {
                    state: self.state,
                    line_num,
                    line,
                })
            }
            Some(rule) => {
                self.state = ScanState::Section(rule.state);
                if rule.inclusive {
                    self.pending = Some((line_num, line.clone()));
                }
                Some(ScanEvent::Enter {
                    state: rule.state,
                    line_num,
                    line,
                })
            }
            None => Some(ScanEvent::Data {
                state: self.state,
                line_num,
                line,
            }),
        }
    }
}

/// Classifies `lines` against `table`, starting in [`ScanState::Head`].
pub fn scan<S, I, L>(lines: I, table: &HeaderTable<S>) -> Scanner<'_, S, I::IntoIter>
where
    S: Copy + PartialEq,
    I: IntoIterator<Item = L>,
    L: AsRef<str> + Clone,
{
    Scanner::new(lines.into_iter(), table)
}
