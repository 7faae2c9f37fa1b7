use crate::catalog::{Detection, Event};
use crate::parsing::segmenter::Block;
use crate::parsing::tokens::{
    normalize_detection, tokenize, Shape, Token, DETECTION_LINE_PATTERN, DETECTION_TIME,
    SOURCE_TIME,
};
use crate::prelude::{CatalogResult, Coordinate, Field, FormatError, ParserConfig};
use chrono::NaiveDateTime;
use regex::Regex;

/// Outcome of decoding one block.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
    Accepted(Event),
    /// No accepted label in the block.
    Filtered,
    Malformed(FormatError),
}

/// Decodes event blocks into [`Event`]s.
#[derive(Debug, Clone)]
pub struct EventParser {
    config: ParserConfig,
    detection_line: Regex,
}

impl EventParser {
    pub fn new(config: ParserConfig) -> CatalogResult<Self> {
        Ok(Self {
            config,
            detection_line: Regex::new(DETECTION_LINE_PATTERN)?,
        })
    }

    pub fn parse(&self, block: &Block<'_>) -> ParseResult {
        let Some(label) = self.accepted_label(block.text) else {
            return ParseResult::Filtered;
        };
        match self.decode(block, label) {
            Ok(event) => ParseResult::Accepted(event),
            Err(err) => ParseResult::Malformed(err),
        }
    }

    fn accepted_label(&self, text: &str) -> Option<&str> {
        self.config
            .labels
            .iter()
            .map(String::as_str)
            .find(|label| !label.is_empty() && text.contains(label))
    }

    fn decode(&self, block: &Block<'_>, label: &str) -> Result<Event, FormatError> {
        let line = block.line;
        let tokens: Vec<Token<'_>> = tokenize(block.text).collect();
        let of_shape = |shape: Shape| {
            tokens
                .iter()
                .filter(move |token| Shape::of(token.text) == shape)
                .map(|token| token.text)
        };

        let source_token = of_shape(Shape::SourceTime).next().ok_or(FormatError::Missing {
            field: Field::SourceTime,
            line,
        })?;
        let source_time = SOURCE_TIME
            .decode(source_token)
            .ok_or_else(|| FormatError::Invalid {
                field: Field::SourceTime,
                value: source_token.to_string(),
                line,
            })?;

        let amplitudes: Vec<f64> = of_shape(Shape::Amplitude)
            .filter_map(|text| text.parse().ok())
            .collect();
        let source_level = *amplitudes.last().ok_or(FormatError::Missing {
            field: Field::Amplitude,
            line,
        })?;

        let mut coordinates = of_shape(Shape::Coordinate).filter_map(|text| text.parse().ok());
        let source_location = match (coordinates.next(), coordinates.next()) {
            (Some(lat), Some(lon)) => Coordinate::new(lat, lon),
            _ => {
                return Err(FormatError::Missing {
                    field: Field::SourceLocation,
                    line,
                })
            }
        };

        let letters = self.sensor_letters(block)?;
        let arrivals = self.detection_times(block)?;
        check_positional_alignment(&letters, arrivals.len(), amplitudes.len(), line)?;

        let detections: Vec<Detection> = letters
            .iter()
            .zip(arrivals)
            .zip(&amplitudes)
            .map(|((&sensor, arrival), &received_level)| Detection {
                sensor,
                arrival,
                received_level,
            })
            .collect();
        debug_assert_eq!(detections.len(), letters.len());

        Ok(Event {
            label: label.to_string(),
            source_time,
            source_level,
            source_location,
            detections,
        })
    }

    /// Third field of the summary line, one sensor letter per character.
    fn sensor_letters(&self, block: &Block<'_>) -> Result<Vec<char>, FormatError> {
        let line = block.line;
        let summary = block
            .text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .rev()
            .nth(self.config.summary_line_from_end.saturating_sub(1))
            .ok_or(FormatError::Missing {
                field: Field::SummaryLine,
                line,
            })?;
        let field = summary.split_whitespace().nth(2).ok_or(FormatError::Missing {
            field: Field::SensorLetters,
            line,
        })?;
        if !field.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(FormatError::Invalid {
                field: Field::SensorLetters,
                value: field.to_string(),
                line,
            });
        }
        Ok(field.chars().collect())
    }

    /// Arrival times of every detection line, in text order.
    fn detection_times(&self, block: &Block<'_>) -> Result<Vec<NaiveDateTime>, FormatError> {
        block
            .text
            .lines()
            .filter_map(|l| self.detection_line.captures(l))
            .map(|caps| {
                let digits = normalize_detection(&caps[1], &caps[2], &caps[3]);
                DETECTION_TIME
                    .decode(&digits)
                    .ok_or_else(|| FormatError::Invalid {
                        field: Field::DetectionLine,
                        value: caps[0].trim().to_string(),
                        line: block.line,
                    })
            })
            .collect()
    }
}

/// The n-th detection line and the n-th amplitude token belong to the n-th
/// sensor letter. A record needs one detection line per letter and one
/// amplitude per letter, optionally followed by a separate source level.
pub fn check_positional_alignment(
    letters: &[char],
    detections: usize,
    amplitudes: usize,
    line: usize,
) -> Result<(), FormatError> {
    let expected = letters.len();
    if detections != expected {
        return Err(FormatError::CountMismatch {
            field: Field::DetectionLine,
            letters: expected,
            found: detections,
            line,
        });
    }
    if amplitudes != expected && amplitudes != expected + 1 {
        return Err(FormatError::CountMismatch {
            field: Field::Amplitude,
            letters: expected,
            found: amplitudes,
            line,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::segmenter::segment;
    use chrono::{Datelike, Timelike};

    const EVENT_BLOCK: &str = "\
II_impulsive picked by analyst
20230451230450 53.3412 -176.4521
A 2023 045123047.120 45.67
B 2023 045123048.450 50.12
C 2023 046000001.010 33.89
 3 II ABC
";

    fn parser() -> EventParser {
        EventParser::new(ParserConfig::default()).unwrap()
    }

    fn block(text: &str) -> Block<'_> {
        Block {
            index: 0,
            line: 10,
            text,
        }
    }

    fn accepted(result: ParseResult) -> Event {
        match result {
            ParseResult::Accepted(event) => event,
            other => panic!("expected an event, got {other:?}"),
        }
    }

    #[test]
    fn single_block_catalog_decodes_three_detections() {
        let text = format!("{}1\n", EVENT_BLOCK);
        let blocks = segment(&text);
        assert_eq!(blocks.len(), 1);

        let event = accepted(parser().parse(&blocks[0]));
        assert_eq!(event.label, "II_impulsive");
        assert_eq!(event.source_time.ordinal(), 45);
        assert_eq!(
            (
                event.source_time.hour(),
                event.source_time.minute(),
                event.source_time.second()
            ),
            (12, 30, 45)
        );
        assert_eq!(event.source_level, 33.89);
        assert_eq!(event.source_location, Coordinate::new(53.3412, -176.4521));

        let levels: Vec<f64> = event.detections.iter().map(|d| d.received_level).collect();
        assert_eq!(levels, vec![45.67, 50.12, 33.89]);
        let letters: Vec<char> = event.detections.iter().map(|d| d.sensor).collect();
        assert_eq!(letters, vec!['A', 'B', 'C']);

        let first = &event.detections[0].arrival;
        assert_eq!((first.hour(), first.minute(), first.second()), (12, 30, 47));
        assert_eq!(first.nanosecond(), 120_000_000);
        let last = &event.detections[2].arrival;
        assert_eq!(last.ordinal(), 46);
        assert_eq!((last.hour(), last.minute(), last.second()), (0, 0, 1));
    }

    #[test]
    fn summary_line_can_sit_above_trailing_notes() {
        let text = format!("{}checked twice\nend record\n", EVENT_BLOCK);
        let deeper = EventParser::new(ParserConfig {
            summary_line_from_end: 3,
            ..Default::default()
        })
        .unwrap();
        let event = accepted(deeper.parse(&block(&text)));
        let letters: Vec<char> = event.detections.iter().map(|d| d.sensor).collect();
        assert_eq!(letters, vec!['A', 'B', 'C']);
        assert_eq!(event.source_level, 33.89);

        assert!(matches!(
            parser().parse(&block(&text)),
            ParseResult::Malformed(FormatError::Missing {
                field: Field::SensorLetters,
                ..
            })
        ));
    }

    #[test]
    fn detections_follow_letter_order_not_line_labels() {
        let text = EVENT_BLOCK.replace(" 3 II ABC", " 3 II CAB");
        let event = accepted(parser().parse(&block(&text)));
        let pairs: Vec<(char, f64)> = event
            .detections
            .iter()
            .map(|d| (d.sensor, d.received_level))
            .collect();
        assert_eq!(pairs, vec![('C', 45.67), ('A', 50.12), ('B', 33.89)]);
    }

    #[test]
    fn separate_source_level_is_last_amplitude() {
        let text = EVENT_BLOCK.replace(" 3 II ABC", "source level 187.25\n 3 II ABC");
        let event = accepted(parser().parse(&block(&text)));
        assert_eq!(event.source_level, 187.25);
        assert_eq!(event.detections[2].received_level, 33.89);
    }

    #[test]
    fn unlabeled_block_is_filtered() {
        let text = EVENT_BLOCK.replace("II_impulsive", "doublet");
        assert_eq!(parser().parse(&block(&text)), ParseResult::Filtered);
    }

    #[test]
    fn any_configured_label_is_accepted() {
        let text = EVENT_BLOCK.replace("II_impulsive", "doublet");
        let parser = EventParser::new(ParserConfig {
            labels: vec!["II_impulsive".into(), "doublet".into()],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(accepted(parser.parse(&block(&text))).label, "doublet");
    }

    #[test]
    fn missing_source_time_is_malformed() {
        let text = EVENT_BLOCK.replace("20230451230450", "2023045123045");
        match parser().parse(&block(&text)) {
            ParseResult::Malformed(err) => {
                assert_eq!(err.field(), Field::SourceTime);
                assert_eq!(err.line(), 10);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn single_coordinate_is_malformed() {
        let text = EVENT_BLOCK.replace(" -176.4521", "");
        assert!(matches!(
            parser().parse(&block(&text)),
            ParseResult::Malformed(FormatError::Missing {
                field: Field::SourceLocation,
                ..
            })
        ));
    }

    #[test]
    fn missing_detection_line_is_count_mismatch() {
        let text = EVENT_BLOCK.replace("B 2023 045123048.450 50.12\n", "B 50.12\n");
        assert_eq!(
            parser().parse(&block(&text)),
            ParseResult::Malformed(FormatError::CountMismatch {
                field: Field::DetectionLine,
                letters: 3,
                found: 2,
                line: 10,
            })
        );
    }

    #[test]
    fn missing_amplitude_is_count_mismatch() {
        let text = EVENT_BLOCK.replace(" 50.12", "");
        assert!(matches!(
            parser().parse(&block(&text)),
            ParseResult::Malformed(FormatError::CountMismatch {
                field: Field::Amplitude,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn short_summary_line_is_malformed() {
        let text = EVENT_BLOCK.replace(" 3 II ABC", " 3 II");
        assert!(matches!(
            parser().parse(&block(&text)),
            ParseResult::Malformed(FormatError::Missing {
                field: Field::SensorLetters,
                ..
            })
        ));
    }

    #[test]
    fn source_line_is_not_a_detection_line() {
        let text = "II_impulsive\n20230451230450  53.3412 -176.4521\n";
        let parser = parser();
        assert_eq!(parser.detection_times(&block(text)).unwrap().len(), 0);
    }

    #[test]
    fn alignment_accepts_trailing_source_level() {
        assert!(check_positional_alignment(&['A', 'B'], 2, 2, 1).is_ok());
        assert!(check_positional_alignment(&['A', 'B'], 2, 3, 1).is_ok());
        assert!(check_positional_alignment(&['A', 'B'], 2, 4, 1).is_err());
        assert!(check_positional_alignment(&['A', 'B'], 3, 2, 1).is_err());
    }
}
