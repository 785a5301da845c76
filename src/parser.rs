use super::{
    Label,
    Labels,
    MetricFamilies,
    Sample,
    Type,
};
use crate::error::{
    Error,
    Result,
};
use tracing::{
    debug,
    warn,
};
use winnow::{
    ascii::{
        digit1,
        escaped,
        newline,
        space0,
        space1,
        Caseless,
    },
    combinator::{
        alt,
        cut_err,
        delimited,
        eof,
        opt,
        preceded,
        separated,
        terminated,
    },
    stream::{
        Accumulate,
        AsChar,
    },
    token::{
        none_of,
        one_of,
        tag,
        take_till,
        take_while,
    },
    PResult,
    Parser,
};

/// Origin reported in errors for documents that don't come from a file.
pub(crate) const STREAM_ORIGIN: &str = "stream";

/// Parse a valid prometheus `metric_name` or `label_name`.
fn name_parser(input: &mut &str) -> PResult<String> {
    let start_group = ('a'..='z', 'A'..='Z', '_', ':');
    let rest_group = ('a'..='z', 'A'..='Z', '0'..='9', '_', ':');
    (one_of(start_group), take_while(0.., rest_group))
        .map(|(ch, rest)| format!("{ch}{rest}"))
        .parse_next(input)
}

/// Parse a label name: `[a-zA-Z_][a-zA-Z0-9_]*`.
fn label_name_parser<'a>(input: &mut &'a str) -> PResult<&'a str> {
    let start_group = ('a'..='z', 'A'..='Z', '_');
    let rest_group = ('a'..='z', 'A'..='Z', '0'..='9', '_');
    (one_of(start_group), take_while(0.., rest_group))
        .recognize()
        .parse_next(input)
}

/// Whether `name` can be written as a label name.
pub(crate) fn is_label_name(name: &str) -> bool {
    label_name_parser.parse(name).is_ok()
}

/// Resolve the `\\`, `\"` and `\n` escapes of a raw label value.
fn unescape_label_value(raw: &str) -> String {
    let mut value = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            value.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => value.push('\n'),
            Some(escaped) => value.push(escaped),
            None => value.push('\\'),
        }
    }
    value
}

/// Resolve the `\\` and `\n` escapes of a HELP text. Other backslashes are kept as is.
fn unescape_help(raw: &str) -> String {
    let mut help = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match (ch, chars.peek()) {
            ('\\', Some('n')) => {
                help.push('\n');
                chars.next();
            }
            ('\\', Some('\\')) => {
                help.push('\\');
                chars.next();
            }
            (ch, _) => help.push(ch),
        }
    }
    help
}

/// Parse a valid prometheus label value, returning it unescaped.
///
/// Examples:
///
/// * `"Test"`
/// * `"Some value"`
fn parse_label_value(input: &mut &str) -> PResult<String> {
    let escaped = escaped(none_of(br#""\"#), '\\', one_of(br#""n\"#));
    preceded('\"', cut_err(terminated(escaped, '\"')))
        .map(unescape_label_value)
        .parse_next(input)
}

/// Parse a Prometheus label key value pair.
///
/// Examples:
///
/// * `key1="value1"`
/// * `key = "value"`
/// * `key= "val"`
fn label_key_value_parser(input: &mut &str) -> PResult<(String, String)> {
    let key = name_parser.parse_next(input)?;
    let _ = (space0, '=', space0).parse_next(input)?;
    let val = parse_label_value.parse_next(input)?;
    Ok((key, val))
}

// Enable us to parse the collection of key value pairs into the `Labels` structure
impl Accumulate<(String, String)> for Labels {
    fn initial(capacity: Option<usize>) -> Self {
        Vec::with_capacity(capacity.unwrap_or(4)).into()
    }

    fn accumulate(&mut self, acc: (String, String)) {
        self.push(Label::new(acc.0, acc.1));
    }
}

/// Parses a list of labels delimited by braces
///
/// Examples:
/// * `{key1="value1",key2="value2"}`
/// * `{key1="value1", key2 = "value2"}`
/// * `{ key1="value1", key2 = "value2", }`
/// * `{}`
///
/// A label name may appear only once.
fn labels_parser(input: &mut &str) -> PResult<Labels> {
    let separator = (space0, ',', space0);
    let list = separated(0.., label_key_value_parser, separator);
    let start_delimiter = ("{", space0);
    let end_delimiter = (space0, opt(','), space0, "}");
    let mut labels =
        delimited(start_delimiter, list, end_delimiter).verify(has_unique_names);
    labels.parse_next(input)
}

fn has_unique_names(labels: &Labels) -> bool {
    labels
        .iter()
        .enumerate()
        .all(|(idx, label)| labels[..idx].iter().all(|prev| prev.name != label.name))
}

/// Parse a valid Prometheus float value (+Inf, -Inf, NaN, ...)
fn float_value_parser(input: &mut &str) -> PResult<f64> {
    let number = (
        opt(one_of(['+', '-'])),
        alt((
            (digit1, opt(('.', opt(digit1)))).map(|_| ()),
            ('.', digit1).map(|_| ()),
        )),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), cut_err(digit1))),
    )
        .recognize()
        .parse_to();
    let nan = tag(Caseless("nan")).value(f64::NAN);
    let inf = alt((tag(Caseless("inf")), tag(Caseless("+inf")))).value(f64::INFINITY);
    let neg_inf = tag(Caseless("-inf")).value(f64::NEG_INFINITY);
    alt((number, nan, inf, neg_inf)).parse_next(input)
}

/// Parse a valid Prometheus int value
fn int_value_parser(input: &mut &str) -> PResult<i64> {
    let prefix = opt(one_of(['+', '-']));
    (prefix, digit1).recognize().parse_to().parse_next(input)
}

/// Validate that the next character is either a new line or an EoF, returning an error if not
fn new_line_or_eof_parser(input: &mut &str) -> PResult<()> {
    alt((eof.map(|_| ()), newline.map(|_| ()))).parse_next(input)
}

/// Parse the rest of line until either EoF or NewLine (Parsing & ignoring the newline
/// character). Trailing white space is not part of the result.
fn rest_of_the_line_parser<'a>(input: &mut &'a str) -> PResult<&'a str> {
    let rest = preceded(space0, take_till(0.., AsChar::is_newline)).parse_next(input)?;
    new_line_or_eof_parser.parse_next(input)?;
    Ok(rest.trim_end())
}

/// The possible types of lines in the Prometheus exposition format
#[derive(Debug, Clone)]
enum Line {
    Empty,
    Comment,
    Help {
        name: String,
        desc: String,
    },
    Type {
        name: String,
        kind: Type,
    },
    Sample {
        name: String,
        labels: Labels,
        value: f64,
        timestamp: Option<i64>,
    },
}

/// Parse a Prometheus comment line.
///
/// A comment is anything that starts with #, including a lone #.
///
/// Example:
/// * `# This is a comment`
fn comment_line_parser(input: &mut &str) -> PResult<Line> {
    preceded((space0, tag("#"), space0), rest_of_the_line_parser)
        .map(|_| Line::Comment)
        .parse_next(input)
}

/// Parse a Prometheus HELP line.
///
/// A HELP line is a comment that starts with #, followed by "HELP", followed by the name of
/// the metric, followed by its description. `\\` and `\n` in the description are
/// unescaped.
///
/// Example:
/// * `# HELP http_request_duration_seconds A histogram of the request duration.`
fn help_line_parser(input: &mut &str) -> PResult<Line> {
    let ignored = (space0, tag("#"), space1, tag("HELP"), space1);
    let name = preceded(ignored, name_parser).parse_next(input)?;
    let desc = rest_of_the_line_parser.map(unescape_help).parse_next(input)?;
    Ok(Line::Help { name, desc })
}

/// Parse a Prometheus TYPE line.
///
/// A TYPE line is a comment that starts with #, followed by "TYPE", followed by the name of
/// the metric, followed by its type. Besides (counter, gauge, untyped, summary, histogram)
/// any other single token is accepted as is.
///
/// Example:
/// * `# TYPE http_request_duration_seconds histogram`
fn type_line_parser(input: &mut &str) -> PResult<Line> {
    let ignored = (space0, tag("#"), space1, tag("TYPE"), space1);
    let name = preceded(ignored, name_parser).parse_next(input)?;
    let kind = preceded(space1, take_till(1.., AsChar::is_space))
        .parse_to()
        .parse_next(input)?;
    (space0, new_line_or_eof_parser).parse_next(input)?;
    Ok(Line::Type { name, kind })
}

/// Parse a Prometheus metric line.
///
/// Examples:
/// * `data_sent:bytes{th_id="worker_0",type="duplex"} 1395`
/// * `metric_without_timestamp_and_labels 12.47`
/// * `metric_without_timestamp_and_labels 12.47 -1`
/// * `http_request_duration_seconds_count 144320`
fn sample_line_parser(input: &mut &str) -> PResult<Line> {
    let name = name_parser.parse_next(input)?;
    // Parse the labels, if they exist, otherwise return an empty Vec.
    let labels = preceded(space0, opt(labels_parser))
        .parse_next(input)?
        .unwrap_or_default();
    let value = preceded(space0, float_value_parser).parse_next(input)?;
    let timestamp = preceded(space0, opt(int_value_parser)).parse_next(input)?;
    // Expect the line to end after
    (space0, new_line_or_eof_parser).parse_next(input)?;
    Ok(Line::Sample {
        name,
        labels,
        value,
        timestamp,
    })
}

/// Parse an empty line. For completeness.
fn empty_line_parser(input: &mut &str) -> PResult<Line> {
    (space0, new_line_or_eof_parser)
        .map(|_| Line::Empty)
        .parse_next(input)
}

/// Parse a single line of a scrape.
///
/// Composed of one of the five possible line types
fn metric_line_parser(input: &mut &str) -> PResult<Line> {
    alt((
        help_line_parser,
        type_line_parser,
        comment_line_parser,
        sample_line_parser,
        empty_line_parser,
    ))
    .parse_next(input)
}

/// Folds parsed lines into metric families.
///
/// A sample joins the current family (the one named by the last HELP, TYPE or sample
/// line) when the family owns its name, otherwise it joins the family of its own name.
#[derive(Debug, Default)]
struct FamilyAssembler {
    families: MetricFamilies,
    current: Option<String>,
}

impl FamilyAssembler {
    fn push(&mut self, line: Line, line_no: usize) {
        match line {
            Line::Empty | Line::Comment => {}
            Line::Help { name, desc } => {
                let family = self.families.family_mut(&name);
                if family.help.is_some() {
                    warn!(line_no, family = %name, "Repeated HELP line ignored");
                } else {
                    family.help = Some(desc);
                }
                self.current = Some(name);
            }
            Line::Type { name, kind } => {
                let family = self.families.family_mut(&name);
                if family.kind.is_some() {
                    warn!(line_no, family = %name, "Repeated TYPE line ignored");
                } else {
                    family.kind = Some(kind);
                }
                self.current = Some(name);
            }
            Line::Sample {
                name,
                labels,
                value,
                timestamp,
            } => {
                let family_name = self
                    .current
                    .as_ref()
                    .filter(|current| {
                        self.families
                            .get(current)
                            .map_or(false, |family| family.owns_sample_name(&name))
                    })
                    .cloned()
                    .unwrap_or_else(|| name.clone());
                self.families
                    .family_mut(&family_name)
                    .samples
                    .push(Sample::new(name, labels, value, timestamp));
                self.current = Some(family_name);
            }
        }
    }

    fn finish(self) -> MetricFamilies {
        self.families
    }
}

/// Parse an exposition document given as a sequence of lines.
///
/// `origin` names the document in errors (a file path, a URL, ...). The first line that
/// cannot be parsed aborts with `Error::MalformedExposition`, carrying its 1-based number.
/// Lines are consumed one at a time, so the input doesn't have to be buffered.
pub fn parse_lines<I, S>(origin: &str, lines: I) -> Result<MetricFamilies>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut assembler = FamilyAssembler::default();
    for (idx, line) in lines.into_iter().enumerate() {
        let line_no = idx + 1;
        let parsed = metric_line_parser
            .parse(line.as_ref())
            .map_err(|e| Error::MalformedExposition {
                origin: origin.into(),
                line: line_no,
                reason: e.to_string(),
            })?;
        assembler.push(parsed, line_no);
    }
    let families = assembler.finish();
    debug!(origin, families = families.len(), "Parsed exposition");
    Ok(families)
}

/// Parse a complete exposition document.
pub fn parse_exposition(origin: &str, input: &str) -> Result<MetricFamilies> {
    parse_lines(origin, input.lines())
}

#[cfg(test)]
mod tests {
    use super::{
        comment_line_parser,
        empty_line_parser,
        float_value_parser,
        help_line_parser,
        int_value_parser,
        is_label_name,
        label_key_value_parser,
        labels_parser,
        metric_line_parser,
        name_parser,
        new_line_or_eof_parser,
        parse_exposition,
        parse_label_value,
        parse_lines,
        rest_of_the_line_parser,
        sample_line_parser,
        type_line_parser,
        Line,
    };
    use crate::{
        tests::{
            init_test_logging,
            prepare_test_data,
            CANONICAL_01,
            EXAMPLE_01,
        },
        Error,
        Type,
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tracing::info;
    use winnow::Parser;

    #[test]
    fn test_parse_name_parser() {
        init_test_logging();

        let success_cases = [
            ("key1", "key1"),
            ("a:b:c", "a:b:c"),
            ("d33", "d33"),
            ("a_233:3:", "a_233:3:"),
        ];
        for (expr, expected) in success_cases {
            info!("Testing successful expr: '{expr}'");
            let matched = name_parser.parse(expr).unwrap();
            assert_eq!(matched, expected);
        }
        let error_cases = ["", "112_abc", "a-b", "test with space"];
        for expr in error_cases {
            info!("Testing failure expr: '{expr}'");
            assert!(name_parser.parse(expr).is_err());
        }
    }

    #[rstest]
    #[case("env", true)]
    #[case("_private", true)]
    #[case("a1_b2", true)]
    #[case("my-env", false)]
    #[case("1x", false)]
    #[case("a:b", false)]
    #[case("", false)]
    fn test_is_label_name(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_label_name(name), expected);
    }

    #[test]
    fn test_label_value_parser() {
        init_test_logging();

        let success_cases = [
            (r#""Test""#, "Test"),
            (
                r#""a string -1234567890 _:@#!""#,
                "a string -1234567890 _:@#!",
            ),
            (r#""""#, ""),
            (
                r#""Cannot find file:\n\"FILE.TXT\"""#,
                "Cannot find file:\n\"FILE.TXT\"",
            ),
            (r#""C:\\DIR""#, r"C:\DIR"),
        ];
        for (expr, expected) in success_cases {
            info!("Testing successful expr: '{expr}'");
            let matched = parse_label_value.parse(expr).unwrap();
            assert_eq!(matched, expected);
        }
        let error_cases = ["", "\"", "\"some string", r#""bad \t escape""#];
        for expr in error_cases {
            info!("Testing failure expr: '{expr}'");
            assert!(parse_label_value.parse(expr).is_err());
        }
    }

    #[test]
    fn test_label_key_value_parser() {
        init_test_logging();

        let success_cases = [
            (r#"key1="Test""#, ("key1", "Test")),
            (r#"key1  = "Test""#, ("key1", "Test")),
            (r#"key1="""#, ("key1", "")),
            (r#"k:_e="@!2334+~`""#, ("k:_e", "@!2334+~`")),
        ];
        for (expr, (key, val)) in success_cases {
            info!("Testing successful expr: '{expr}'");
            let (recv_key, recv_val) = label_key_value_parser.parse(expr).unwrap();
            assert_eq!(key, recv_key);
            assert_eq!(val, recv_val);
        }
        let error_cases = [
            "",
            r#"key1="Test"#,
            r#""key1"="Test""#,
            "key1=",
            r#"key1 "Test""#,
        ];
        for expr in error_cases {
            info!("Testing failure expr: '{expr}'");
            assert!(label_key_value_parser.parse(expr).is_err());
        }
    }

    #[test]
    fn test_labels_parser() {
        init_test_logging();

        let success_cases = [
            r#"{key1="value1",key2="value2"}"#,
            r#"{key1="value1", key2 = "value2"}"#,
            r#"{ key1="value1",    key2 = "value2" }"#,
            r#"{ key1  =  "value1",    key2 = "value2" }"#,
            r#"{key1="value1",key2="value2",}"#,
        ];
        for expr in success_cases {
            info!("Testing successful expr: '{expr}'");
            let labels = labels_parser.parse(expr).unwrap();
            assert_eq!(labels.len(), 2);
            let mut iter = labels.iter();
            let label = iter.next().unwrap();
            assert_eq!("key1", label.name);
            assert_eq!("value1", label.value);
            let label = iter.next().unwrap();
            assert_eq!("key2", label.name);
            assert_eq!("value2", label.value);
        }

        assert!(labels_parser.parse("{}").unwrap().is_empty());

        let error_cases = [
            "",
            r#"{key1="value1",key2="value2""#,
            r#"{key1="val"ue1"}"#,
            r#"{key1="value1" key2="value2"}"#,
            r#"{key1="value1",key1="value2"}"#,
        ];
        for expr in error_cases {
            info!("Testing failure expr: '{expr}'");
            assert!(labels_parser.parse(expr).is_err());
        }
    }

    #[test]
    fn test_int_value_parser() {
        init_test_logging();

        let success_cases = [
            ("0", 0),
            ("1", 1),
            ("-1", -1),
            ("100000", 100000),
            ("-1345555", -1345555),
        ];
        for (expr, val) in success_cases {
            info!("Testing successful expr: '{expr}'");
            let recv_val = int_value_parser.parse(expr).unwrap();
            assert_eq!(val, recv_val);
        }

        let error_cases = ["", "b123"];
        for expr in error_cases {
            info!("Testing failure expr: '{expr}'");
            assert!(int_value_parser.parse(expr).is_err());
        }
    }

    #[test]
    fn test_float_value_parser() {
        init_test_logging();

        let success_cases = [
            ("0", 0.0),
            ("0.0", 0.0),
            ("1.0", 1.0),
            ("-1.0", -1.0),
            ("Inf", f64::INFINITY),
            ("+Inf", f64::INFINITY),
            ("-Inf", f64::NEG_INFINITY),
            ("1e4", 1.0e4),
            ("NaN", f64::NAN),
            ("nan", f64::NAN),
            ("NAN", f64::NAN),
            ("-1.23e+1", -1.23e+1),
            ("-1.23e-1", -1.23e-1),
            ("+.22", 0.22),
            (".33", 0.33),
        ];
        for (expr, num) in success_cases {
            info!("Testing successful expr: '{expr}'");
            let parsed = float_value_parser.parse(expr).unwrap();
            assert!(parsed == num || (parsed.is_nan() && num.is_nan()));
        }

        let error_cases = ["", "abc", "1e", "--1"];
        for expr in error_cases {
            info!("Testing failure expr: '{expr}'");
            assert!(float_value_parser.parse(expr).is_err());
        }
    }

    #[test]
    fn test_new_line_or_eof_parser() {
        init_test_logging();

        let success_cases = ["", "\n"];
        for expr in success_cases {
            info!("Testing successful expr: '{expr}'");
            let res = new_line_or_eof_parser.parse(expr);
            assert_eq!(res, Ok(()));
        }

        let error_cases = [" ", "\t", "abc"];
        for expr in error_cases {
            info!("Testing failure expr: '{expr}'");
            let res = new_line_or_eof_parser.parse(expr);
            assert!(res.is_err());
        }
    }

    #[test]
    fn test_rest_of_the_line_parser() {
        init_test_logging();

        let success_cases = [("1\n", "1"), ("   1\n", "1"), ("a b  ", "a b"), ("", "")];
        for (expr, expected) in success_cases {
            info!("Testing successful expr: '{expr}'");
            let parsed = rest_of_the_line_parser.parse(expr).unwrap();
            assert_eq!(parsed, expected);
        }
    }

    #[test]
    fn test_empty_line_parser() {
        init_test_logging();

        let success_cases = ["", "\n", "   \n", "\t", "   "];
        for expr in success_cases {
            info!("Testing successful expr: '{expr}'");
            let res = empty_line_parser.parse(expr);
            assert!(res.is_ok());
        }

        let error_cases = ["not-empty\n", "@\n"];
        for expr in error_cases {
            info!("Testing failure expr: '{expr}'");
            let res = empty_line_parser.parse(expr);
            assert!(res.is_err());
        }
    }

    #[test]
    fn test_sample_line_parser_01() {
        init_test_logging();

        let cases = [
            r#"data_sent:bytes{th_id="worker_0",type="duplex"} 1395 -1"#,
            "data_sent:bytes{th_id=\"worker_0\",type=\"duplex\"} 1395 -1\n",
            "data_sent:bytes{th_id=\"worker_0\",type=\"duplex\"} 1395 -1   \n",
            r#"data_sent:bytes { th_id = "worker_0" , type = "duplex" }   1395  -1  "#,
        ];
        for expr in cases {
            info!("Testing successful expr: '{expr}'");
            let (name, labels, value, timestamp) = match sample_line_parser.parse(expr) {
                Ok(Line::Sample {
                    name,
                    labels,
                    value,
                    timestamp,
                }) => (name, labels, value, timestamp),
                res => panic!("Received unexpected {res:?}"),
            };
            assert_eq!(name, "data_sent:bytes");
            assert_eq!(labels.len(), 2);
            let mut iter = labels.iter();
            let label = iter.next().unwrap();
            assert_eq!("th_id", label.name);
            assert_eq!("worker_0", label.value);
            let label = iter.next().unwrap();
            assert_eq!("type", label.name);
            assert_eq!("duplex", label.value);
            assert_eq!(value, 1395.0);
            assert_eq!(timestamp, Some(-1));
        }
    }

    #[test]
    fn test_sample_line_parser_failure_01() {
        init_test_logging();

        let cases = [
            r#"data_sent:bytes{th_id="worker_0",type="duplex"}"#,
            r#"data_sent:bytes { th_id = "worker_0" , type = "duplex" }   1395  -1  some-more-text"#,
            r#"data_sent:bytes{th_id="worker_0" 1395"#,
        ];
        for expr in cases {
            info!("Testing failure expr: '{expr}'");
            assert!(sample_line_parser.parse(expr).is_err());
        }
    }

    #[test]
    fn test_comment_line_parser() {
        init_test_logging();

        let success_cases = ["# a comment", "  #    Something else", "#"];
        for expr in success_cases {
            info!("Testing successful expr: '{expr}'");
            assert!(matches!(comment_line_parser.parse(expr), Ok(Line::Comment)));
        }

        let error_cases = ["", "^# something"];
        for expr in error_cases {
            info!("Testing failure expr: '{expr}'");
            assert!(comment_line_parser.parse(expr).is_err());
        }
    }

    #[test]
    fn test_help_line_parser() {
        init_test_logging();

        let success_cases = [
            (
                "# HELP http_request_duration_seconds A histogram of the request duration.",
                (
                    "http_request_duration_seconds",
                    "A histogram of the request duration.",
                ),
            ),
            (
                "  # HELP name long description",
                ("name", "long description"),
            ),
            ("# HELP name", ("name", "")),
            (
                r"# HELP name two\nlines, C:\\DIR and \t kept",
                ("name", "two\nlines, C:\\DIR and \\t kept"),
            ),
        ];
        for (expr, (expected_name, expected_desc)) in success_cases {
            info!("Testing successful expr: '{expr}'");
            let (name, desc) = match help_line_parser.parse(expr) {
                Ok(Line::Help { name, desc }) => (name, desc),
                res => panic!("Received unexpected {res:?}"),
            };
            assert_eq!(expected_name, name);
            assert_eq!(expected_desc, desc);
        }

        let error_cases = ["", "# something", "# HELP", "# HELPER name text"];
        for expr in error_cases {
            info!("Testing failure expr: '{expr}'");
            assert!(help_line_parser.parse(expr).is_err());
        }
    }

    #[test]
    fn test_type_line_parser() {
        init_test_logging();

        let expected_name = "test";
        let success_cases = [
            ("# TYPE test histogram", Type::Histogram),
            ("# TYPE test summary", Type::Summary),
            ("# TYPE test counter", Type::Counter),
            ("# TYPE test gauge", Type::Gauge),
            ("# TYPE test untyped", Type::Untyped),
            ("# TYPE test Summary", Type::Summary),
            ("# TYPE test gauge  ", Type::Gauge),
            ("# TYPE test stateset", Type::Unknown("stateset".into())),
        ];
        for (expr, expected_kind) in success_cases {
            info!("Testing successful expr: '{expr}'");
            let (name, kind) = match type_line_parser.parse(expr) {
                Ok(Line::Type { name, kind }) => (name, kind),
                res => panic!("Received unexpected {res:?}"),
            };
            assert_eq!(expected_name, name);
            assert_eq!(expected_kind, kind);
        }

        let error_cases = ["", "# TYPE test", "# TYPE", "# TYPE test gauge extra"];
        for expr in error_cases {
            info!("Testing failure expr: '{expr}'");
            assert!(type_line_parser.parse(expr).is_err());
        }
    }

    #[test]
    fn test_metric_line_parser() {
        init_test_logging();

        let cases = [
            "# TYPE test histogram",
            "# TYPE test Summary",
            "# HELP http_request_duration_seconds A histogram of the request duration.",
            "  # HELP name long description",
            "# a comment",
            "#",
            "",
            r#"data_sent:bytes{th_id="worker_0",type="duplex"} 1395 -1"#,
            r#"tower:histogram_bucket{name="handler",th_id="worker_0",type="1",le="64"} 0"#,
            r#"tower:histogram_bucket{name="handler",th_id="worker_0",type="1",le="+Inf"} 0"#,
            r#"tower:histogram_sum{name="handler",th_id="worker_0",type="1"} 0"#,
            r#"tower:histogram_count{name="handler",th_id="worker_0",type="1"} 0"#,
        ];
        for expr in cases {
            info!("Testing successful expr: '{expr}'");
            assert!(metric_line_parser.parse(expr).is_ok());
        }
    }

    #[rstest]
    fn test_parse_fixtures(#[values(EXAMPLE_01, CANONICAL_01)] data: &str) {
        init_test_logging();

        let families = parse_exposition("fixture", data).unwrap();
        let samples: usize = families.iter().map(|family| family.samples.len()).sum();
        let expected = data
            .lines()
            .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
            .count();
        assert_eq!(samples, expected);
    }

    #[test]
    fn test_scrape_success_01() {
        init_test_logging();

        let input = r#"
                # TYPE go_memstats_frees_total counter
                # HELP go_memstats_frees_total Total number of frees.
                go_memstats_frees_total 4.130418363e+09
            "#;
        let input = prepare_test_data(input);
        let families = parse_exposition("test", &input).unwrap();
        assert_eq!(families.len(), 1);
        let family = families.get("go_memstats_frees_total").unwrap();
        assert_eq!(family.kind, Some(Type::Counter));
        assert_eq!(family.help.as_deref(), Some("Total number of frees."));
        assert_eq!(family.samples[0].value, 4.130418363e+09);
    }

    #[test]
    fn test_metadata_without_samples() {
        init_test_logging();

        let input = r#"
            # HELP http_request_duration_seconds A histogram of the request duration.
            # TYPE http_request_duration_seconds histogram
            # TYPE http_request counter
        "#;
        let input = prepare_test_data(input);
        let families = parse_exposition("test", &input).unwrap();
        assert_eq!(families.len(), 2);
        let family = families.get("http_request_duration_seconds").unwrap();
        assert_eq!(family.kind, Some(Type::Histogram));
        assert!(family.samples.is_empty());
        assert_eq!(
            families.get("http_request").unwrap().kind,
            Some(Type::Counter)
        );
    }

    #[test]
    fn test_repeated_metadata_keeps_first() {
        init_test_logging();

        let input = r#"
            # HELP go_info Information about the Go environment.
            # HELP go_info Something else.
            # TYPE go_info gauge
            # TYPE go_info counter
            go_info{version="go1.15.6"} 1
        "#;
        let input = prepare_test_data(input);
        let families = parse_exposition("test", &input).unwrap();
        let family = families.get("go_info").unwrap();
        assert_eq!(
            family.help.as_deref(),
            Some("Information about the Go environment.")
        );
        assert_eq!(family.kind, Some(Type::Gauge));
        assert_eq!(family.samples.len(), 1);
    }

    #[test]
    fn test_family_assignment() {
        init_test_logging();

        let input = r#"
            # TYPE rpc summary
            rpc{quantile="0.5"} 1
            rpc_sum 2
            rpc_count 3
            rpc_bucket 4
            plain 5
            plain_sum 6
            rpc 7
        "#;
        let input = prepare_test_data(input);
        let families = parse_exposition("test", &input).unwrap();
        let names: Vec<_> = families.iter().map(|family| family.name.as_str()).collect();
        assert_eq!(names, ["rpc", "rpc_bucket", "plain", "plain_sum"]);
        let rpc = families.get("rpc").unwrap();
        let sample_names: Vec<_> = rpc.samples.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(sample_names, ["rpc", "rpc_sum", "rpc_count", "rpc"]);
    }

    #[test]
    fn test_malformed_line_number() {
        init_test_logging();

        let input = "# TYPE up gauge\nup 1\n\nup{path=\"/x\" 1\n";
        let err = parse_exposition("http://host:9100/metrics", input).unwrap_err();
        let Error::MalformedExposition { origin, line, .. } = err else {
            panic!("expected a malformed exposition error, got {err:?}");
        };
        assert_eq!(origin, "http://host:9100/metrics");
        assert_eq!(line, 4);
    }

    #[test]
    fn test_parse_lines_is_reusable_after_failure() {
        init_test_logging();

        assert!(parse_lines("bad", ["up{ 1"]).is_err());
        let families = parse_lines("good", vec![String::from("up 1")]).unwrap();
        assert_eq!(families.len(), 1);
        assert_eq!(families.get("up").unwrap().samples.len(), 1);
    }
}
