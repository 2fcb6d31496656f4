mod json_workbook_test;
mod pipeline_test;
