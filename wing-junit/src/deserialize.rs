// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deserialize a `Report`.

use crate::{DeserializeError, NonSuccessKind, Property, Report, Testcase, TestcaseStatus, Testsuite};
use indexmap::map::IndexMap;
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use std::time::Duration;

static TESTSUITES_TAG: &str = "testsuites";
static TESTSUITE_TAG: &str = "testsuite";
static TESTCASE_TAG: &str = "testcase";
static PROPERTIES_TAG: &str = "properties";
static PROPERTY_TAG: &str = "property";
static FAILURE_TAG: &str = "failure";
static ERROR_TAG: &str = "error";
static SKIPPED_TAG: &str = "skipped";
static SYSTEM_OUT_TAG: &str = "system-out";
static SYSTEM_ERR_TAG: &str = "system-err";

/// Markers that can begin a JUnit document. `<testsuite` also matches `<testsuites`.
static DOCUMENT_START_MARKERS: &[&str] = &["<?xml", "<testsuite"];

pub(crate) fn deserialize_report(input: &str) -> Result<Report, DeserializeError> {
    if input.trim().is_empty() {
        return Err(DeserializeError::Empty);
    }

    // Test runners commonly print progress output before the document.
    let start = find_document_start(input).ok_or(DeserializeError::NoRoot)?;

    let mut reader = Reader::from_str(&input[start..]);
    // Treat `<skipped/>` and friends the same as `<skipped></skipped>`.
    reader.config_mut().expand_empty_elements = true;

    Deserializer { reader }.read_root()
}

fn find_document_start(input: &str) -> Option<usize> {
    DOCUMENT_START_MARKERS
        .iter()
        .filter_map(|marker| input.find(marker))
        .min()
}

struct Deserializer<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> Deserializer<'a> {
    fn read_root(&mut self) -> Result<Report, DeserializeError> {
        loop {
            match self.reader.read_event()? {
                Event::Start(start) => {
                    return if tag_is(&start, TESTSUITES_TAG) {
                        self.read_testsuites(&start)
                    } else if tag_is(&start, TESTSUITE_TAG) {
                        let testsuite = self.read_testsuite(&start)?;
                        let mut report = Report::new(testsuite.name.clone());
                        report.time = testsuite.time;
                        report.add_testsuite(testsuite);
                        Ok(report)
                    } else {
                        Err(DeserializeError::UnexpectedRoot {
                            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
                        })
                    };
                }
                Event::Eof => return Err(DeserializeError::NoRoot),
                // The declaration, comments, doctypes and whitespace.
                _ => {}
            }
        }
    }

    fn read_testsuites(&mut self, start: &BytesStart<'_>) -> Result<Report, DeserializeError> {
        let mut attributes = Attributes::read(start, TESTSUITES_TAG)?;
        let mut report = Report::new(attributes.take("name").unwrap_or_default());
        report.time = attributes.take_time("time")?;

        loop {
            match self.read_event(TESTSUITES_TAG)? {
                Event::Start(child) if tag_is(&child, TESTSUITE_TAG) => {
                    let testsuite = self.read_testsuite(&child)?;
                    report.add_testsuite(testsuite);
                }
                Event::Start(child) => self.skip(&child)?,
                Event::End(_) => return Ok(report),
                _ => {}
            }
        }
    }

    fn read_testsuite(&mut self, start: &BytesStart<'_>) -> Result<Testsuite, DeserializeError> {
        let mut attributes = Attributes::read(start, TESTSUITE_TAG)?;
        let mut testsuite = Testsuite::new(attributes.take("name").unwrap_or_default());
        testsuite.time = attributes.take_time("time")?;
        let tests = attributes.take_count("tests")?;
        let failures = attributes.take_count("failures")?;
        let errors = attributes.take_count("errors")?;
        let skipped = attributes.take_count("skipped")?;

        loop {
            match self.read_event(TESTSUITE_TAG)? {
                Event::Start(child) => {
                    if tag_is(&child, TESTCASE_TAG) {
                        let testcase = self.read_testcase(&child)?;
                        testsuite.add_testcase(testcase);
                    } else if tag_is(&child, PROPERTIES_TAG) {
                        self.read_properties(&mut testsuite)?;
                    } else if tag_is(&child, SYSTEM_OUT_TAG) {
                        let text = self.read_text(SYSTEM_OUT_TAG)?;
                        testsuite.set_system_out(text);
                    } else if tag_is(&child, SYSTEM_ERR_TAG) {
                        let text = self.read_text(SYSTEM_ERR_TAG)?;
                        testsuite.set_system_err(text);
                    } else {
                        self.skip(&child)?;
                    }
                }
                Event::End(_) => break,
                _ => {}
            }
        }

        // Counts declared on the element win over the counted testcases.
        if let Some(tests) = tests {
            testsuite.tests = tests;
        }
        if let Some(failures) = failures {
            testsuite.failures = failures;
        }
        if let Some(errors) = errors {
            testsuite.errors = errors;
        }
        if let Some(skipped) = skipped {
            testsuite.skipped = skipped;
        }
        testsuite.extra = attributes.into_extra();

        Ok(testsuite)
    }

    fn read_testcase(&mut self, start: &BytesStart<'_>) -> Result<Testcase, DeserializeError> {
        let mut attributes = Attributes::read(start, TESTCASE_TAG)?;
        let mut testcase = Testcase::new(
            attributes.take("name").unwrap_or_default(),
            TestcaseStatus::success(),
        );
        testcase.classname = attributes.take("classname");
        testcase.time = attributes.take_time("time")?;
        testcase.assertions = attributes.take_count("assertions")?;

        loop {
            match self.read_event(TESTCASE_TAG)? {
                Event::Start(child) => {
                    let status = if tag_is(&child, FAILURE_TAG) {
                        Some(self.read_status(
                            &child,
                            TestcaseStatus::non_success(NonSuccessKind::Failure),
                            FAILURE_TAG,
                        )?)
                    } else if tag_is(&child, ERROR_TAG) {
                        Some(self.read_status(
                            &child,
                            TestcaseStatus::non_success(NonSuccessKind::Error),
                            ERROR_TAG,
                        )?)
                    } else if tag_is(&child, SKIPPED_TAG) {
                        Some(self.read_status(&child, TestcaseStatus::skipped(), SKIPPED_TAG)?)
                    } else if tag_is(&child, SYSTEM_OUT_TAG) {
                        let text = self.read_text(SYSTEM_OUT_TAG)?;
                        testcase.set_system_out(text);
                        None
                    } else if tag_is(&child, SYSTEM_ERR_TAG) {
                        let text = self.read_text(SYSTEM_ERR_TAG)?;
                        testcase.set_system_err(text);
                        None
                    } else {
                        self.skip(&child)?;
                        None
                    };

                    // The first status element wins.
                    if let Some(status) = status
                        && testcase.status == TestcaseStatus::Success
                    {
                        testcase.status = status;
                    }
                }
                Event::End(_) => break,
                _ => {}
            }
        }

        testcase.extra = attributes.into_extra();
        Ok(testcase)
    }

    fn read_status(
        &mut self,
        start: &BytesStart<'_>,
        mut status: TestcaseStatus,
        element: &'static str,
    ) -> Result<TestcaseStatus, DeserializeError> {
        let mut attributes = Attributes::read(start, element)?;
        if let Some(message) = attributes.take("message") {
            status.set_message(message);
        }
        if let Some(ty) = attributes.take("type") {
            status.set_type(ty);
        }

        let description = self.read_text(element)?;
        if !description.trim().is_empty() {
            status.set_description(description);
        }
        Ok(status)
    }

    fn read_properties(&mut self, testsuite: &mut Testsuite) -> Result<(), DeserializeError> {
        loop {
            match self.read_event(PROPERTIES_TAG)? {
                Event::Start(child) => {
                    if tag_is(&child, PROPERTY_TAG) {
                        let mut attributes = Attributes::read(&child, PROPERTY_TAG)?;
                        testsuite.add_property(Property::new(
                            attributes.take("name").unwrap_or_default(),
                            attributes.take("value").unwrap_or_default(),
                        ));
                    }
                    self.skip(&child)?;
                }
                Event::End(_) => return Ok(()),
                _ => {}
            }
        }
    }

    /// Reads the text content of the current element, up to and including its end tag.
    fn read_text(&mut self, element: &'static str) -> Result<String, DeserializeError> {
        let mut text = String::new();
        loop {
            match self.read_event(element)? {
                Event::Text(chunk) => {
                    text.push_str(&chunk.unescape().map_err(quick_xml::Error::from)?)
                }
                Event::CData(chunk) => text.push_str(&String::from_utf8_lossy(&chunk.into_inner())),
                Event::Start(child) => self.skip(&child)?,
                Event::End(_) => return Ok(text),
                _ => {}
            }
        }
    }

    fn skip(&mut self, start: &BytesStart<'_>) -> Result<(), DeserializeError> {
        self.reader.read_to_end(start.name())?;
        Ok(())
    }

    fn read_event(&mut self, element: &'static str) -> Result<Event<'a>, DeserializeError> {
        match self.reader.read_event()? {
            Event::Eof => Err(DeserializeError::UnexpectedEof {
                element: element.to_owned(),
            }),
            event => Ok(event),
        }
    }
}

fn tag_is(start: &BytesStart<'_>, tag: &str) -> bool {
    start.name().as_ref() == tag.as_bytes()
}

/// The attributes of an element, consumed as they are interpreted.
///
/// Whatever is left over ends up in the `extra` map of the model type.
struct Attributes {
    element: &'static str,
    values: IndexMap<String, String>,
}

impl Attributes {
    fn read(start: &BytesStart<'_>, element: &'static str) -> Result<Self, DeserializeError> {
        let mut values = IndexMap::new();
        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(quick_xml::Error::from)?
                .into_owned();
            values.insert(key, value);
        }
        Ok(Self { element, values })
    }

    fn take(&mut self, name: &str) -> Option<String> {
        self.values.shift_remove(name)
    }

    fn take_count(&mut self, name: &'static str) -> Result<Option<usize>, DeserializeError> {
        let Some(value) = self.take(name) else {
            return Ok(None);
        };
        value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| self.invalid(name, value))
    }

    fn take_time(&mut self, name: &'static str) -> Result<Option<Duration>, DeserializeError> {
        let Some(value) = self.take(name) else {
            return Ok(None);
        };
        value
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .map(Some)
            .ok_or_else(|| self.invalid(name, value))
    }

    fn invalid(&self, attribute: &'static str, value: String) -> DeserializeError {
        DeserializeError::InvalidAttribute {
            element: self.element,
            attribute,
            value,
        }
    }

    fn into_extra(self) -> IndexMap<String, String> {
        self.values
    }
}
